//! The validation pass: walk a decoded tree against its schema and apply
//! each field's on-fail action in place.
//!
//! Directives run in declaration order and the first failure on a field
//! decides its fate. Container actions apply to the whole subtree, so a
//! filtered or reasked container is not descended into.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use railguard_core::{
    CheckResult, FieldOutcome, FieldPath, FieldState, OnFailAction, Reask, ValidationError,
    ValidationReport, Value,
};
use railguard_schema::{NodeBody, SchemaNode};

/// Runs one validation pass over `value`, mutating it in place.
///
/// On return the tree holds the corrected values: fixes substituted,
/// filtered fields replaced with [`Value::Absent`] (and dropped from lists),
/// and reask failures replaced with [`Value::Reask`] markers. Only an
/// `exception` action aborts the pass.
pub async fn run_pass(
    schema: &SchemaNode,
    value: &mut Value,
) -> Result<ValidationReport, ValidationError> {
    let mut report = ValidationReport::new();
    validate_node(schema, value, FieldPath::root(), &mut report).await?;
    debug!(
        fields = report.outcomes.len(),
        reasks = report.batch.len(),
        "validation pass finished"
    );
    Ok(report)
}

// Recursion over an async tree walk needs the boxed-future form.
fn validate_node<'a>(
    schema: &'a SchemaNode,
    value: &'a mut Value,
    path: FieldPath,
    report: &'a mut ValidationReport,
) -> Pin<Box<dyn Future<Output = Result<(), ValidationError>> + Send + 'a>> {
    Box::pin(async move {
        // Markers planted by the decoder (missing or unconvertible fields)
        // flow straight into the batch.
        if let Value::Reask(marker) = &*value {
            report.outcomes.push(FieldOutcome::invalid(
                path,
                FieldState::InvalidReask,
                &marker.error_message,
            ));
            report.batch.push((**marker).clone());
            return Ok(());
        }
        if value.is_absent() {
            return Ok(());
        }

        let mut descend = true;
        let mut failed = false;

        for directive in &schema.directives {
            let result = directive.validator().check(value).await;
            let (error_message, fix_value) = match result {
                CheckResult::Pass => continue,
                CheckResult::Fail {
                    error_message,
                    fix_value,
                } => (error_message, fix_value),
            };
            failed = true;

            match directive.on_fail {
                OnFailAction::Noop => {
                    warn!(path = %path, directive = %directive.name, error = %error_message,
                        "validation failed, keeping value");
                    report.outcomes.push(FieldOutcome::invalid(
                        path.clone(),
                        FieldState::InvalidNoop,
                        error_message,
                    ));
                }
                OnFailAction::Filter => {
                    debug!(path = %path, directive = %directive.name, error = %error_message,
                        "validation failed, filtering value");
                    *value = Value::Absent;
                    descend = false;
                    report.outcomes.push(FieldOutcome::invalid(
                        path.clone(),
                        FieldState::InvalidFiltered,
                        error_message,
                    ));
                }
                OnFailAction::Fix => match fix_value {
                    Some(fix) => {
                        debug!(path = %path, directive = %directive.name,
                            "validation failed, substituting fix value");
                        *value = fix;
                        report.outcomes.push(FieldOutcome::invalid(
                            path.clone(),
                            FieldState::InvalidFixed,
                            error_message,
                        ));
                    }
                    None => {
                        warn!(path = %path, directive = %directive.name, error = %error_message,
                            "validator offered no fix, keeping value");
                        report.outcomes.push(FieldOutcome::invalid(
                            path.clone(),
                            FieldState::InvalidNoop,
                            error_message,
                        ));
                    }
                },
                OnFailAction::Reask => {
                    debug!(path = %path, directive = %directive.name, error = %error_message,
                        "validation failed, flagging for reask");
                    let mut marker = Reask::new(path.clone(), value.clone(), &error_message);
                    marker.fix_value = fix_value;
                    *value = Value::Reask(Box::new(marker.clone()));
                    descend = false;
                    report.outcomes.push(FieldOutcome::invalid(
                        path.clone(),
                        FieldState::InvalidReask,
                        error_message,
                    ));
                    report.batch.push(marker);
                }
                OnFailAction::Exception => {
                    report.outcomes.push(FieldOutcome::invalid(
                        path.clone(),
                        FieldState::InvalidFatal,
                        &error_message,
                    ));
                    return Err(ValidationError::new(path, error_message));
                }
            }
            // First failure decides the field.
            break;
        }

        if !failed {
            report.outcomes.push(FieldOutcome::valid(path.clone()));
        }

        if descend {
            match (&schema.body, &mut *value) {
                (NodeBody::Object(fields), Value::Object(map)) => {
                    for (name, child_schema) in fields {
                        if let Some(child) = map.get_mut(name) {
                            validate_node(child_schema, child, path.key(name), report).await?;
                        }
                    }
                }
                (NodeBody::List(Some(element)), Value::List(items)) => {
                    for (idx, item) in items.iter_mut().enumerate() {
                        validate_node(element, item, path.index(idx), report).await?;
                    }
                    // Filtered elements leave the sequence entirely.
                    items.retain(|item| !item.is_absent());
                }
                _ => {}
            }
        }

        Ok(())
    })
}
