//! Rule matching and backoff computation.

use std::time::Duration;

use conveyor_task::ErrorKind;
use conveyor_workflow::RetryRule;

/// What the engine should do about a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
  /// Re-invoke the same state after the delay elapses.
  Retry { delay: Duration },
  /// Attempts exhausted or no rule matched; fail the execution.
  Fail,
}

/// Decide whether a failed attempt is retried.
///
/// `attempt` counts attempts already made for this state in this execution;
/// the first failure arrives with `attempt == 1`. Attempt counts reset when
/// the execution enters a new state. The first rule whose matcher contains
/// the error kind wins; rules after it are never consulted.
pub fn decide(rules: &[RetryRule], kind: ErrorKind, attempt: u32) -> RetryDecision {
  let Some(rule) = rules.iter().find(|rule| rule.matcher.matches(kind)) else {
    return RetryDecision::Fail;
  };

  if attempt < rule.max_attempts {
    RetryDecision::Retry {
      delay: backoff_delay(rule, attempt),
    }
  } else {
    RetryDecision::Fail
  }
}

/// Delay before retry number `attempt + 1`: `interval * rate^(attempt - 1)`.
///
/// The exponent is capped so a large attempt count cannot overflow the
/// multiplication into nonsense; the result saturates instead.
pub fn backoff_delay(rule: &RetryRule, attempt: u32) -> Duration {
  const MAX_EXP: i32 = 30;

  let exp = i32::try_from(attempt.saturating_sub(1)).map_or(MAX_EXP, |e| e.min(MAX_EXP));
  let millis = rule.interval.as_millis() as f64 * rule.backoff_rate.powi(exp);
  Duration::from_millis(saturating_millis(millis))
}

fn saturating_millis(val: f64) -> u64 {
  if !val.is_finite() || val < 0.0 {
    0
  } else if val >= u64::MAX as f64 {
    u64::MAX
  } else {
    val as u64
  }
}
