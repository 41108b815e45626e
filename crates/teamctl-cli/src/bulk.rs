//! Best-effort application of one remote operation across many targets.
//!
//! Targets arrive already resolved and in operator order. A missing target or
//! a failed call is recorded against its token and the loop moves on; nothing
//! here aborts early, so the outcome list always matches the token list.

use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::client::{CliResult, RemoteError};
use crate::output::Printer;

/// Result of one target in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BulkOutcome<T> {
    Done { token: String, value: T },
    Failed { token: String, message: String },
}

#[cfg(test)]
impl<T> BulkOutcome<T> {
    fn token(&self) -> &str {
        match self {
            Self::Done { token, .. } | Self::Failed { token, .. } => token,
        }
    }
}

/// Run `op` for every resolved target in order.
///
/// `on_missing` renders the error line for an unresolved token and
/// `on_failure` the line for a rejected call.
pub(crate) async fn run_bulk<E, T, Op, Fut>(
    targets: Vec<(String, Option<E>)>,
    on_missing: impl Fn(&str) -> String,
    on_failure: impl Fn(&str, &E, &RemoteError) -> String,
    mut op: Op,
) -> Vec<BulkOutcome<T>>
where
    E: Clone,
    Op: FnMut(E) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut outcomes = Vec::with_capacity(targets.len());
    for (token, entity) in targets {
        let outcome = match entity {
            None => BulkOutcome::Failed {
                message: on_missing(&token),
                token,
            },
            Some(entity) => match op(entity.clone()).await {
                Ok(value) => BulkOutcome::Done { token, value },
                Err(err) => {
                    debug!(%token, error = %err, "bulk item rejected");
                    BulkOutcome::Failed {
                        message: on_failure(&token, &entity, &err),
                        token,
                    }
                }
            },
        };
        outcomes.push(outcome);
    }
    outcomes
}

/// Push successes to the result stream and failures to the error stream, keeping order.
pub(crate) fn report<T: Serialize>(
    printer: &mut Printer,
    outcomes: &[BulkOutcome<T>],
    render: impl Fn(&T) -> String,
) -> CliResult<()> {
    for outcome in outcomes {
        match outcome {
            BulkOutcome::Done { value, .. } => printer.print(render(value), value)?,
            BulkOutcome::Failed { message, .. } => printer.print_error(message.clone()),
        }
    }
    Ok(())
}
