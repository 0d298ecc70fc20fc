//! Propagation of generated operations down the class hierarchy
//!
//! A subclass inherits every registration of its parent, except operations
//! it implements itself. Operations the subclass requests replace an
//! inherited registration of the same name in place, or are appended.

use crate::generator::Registration;
use crate::operation::NativeMethod;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Effective registrations of a class
///
/// Returns `inherited` itself (the same allocation) when the class neither
/// overrides nor requests anything, so unchanged subclasses share their
/// parent's list. Entries stay unique by operation name, which makes the
/// result stable when applied again to its own output.
pub fn propagate(
    class_name: &str,
    inherited: &Arc<[Registration]>,
    own: &[Registration],
    namespace: &FxHashMap<String, NativeMethod>,
) -> Arc<[Registration]> {
    let mut effective: Vec<Registration> = Vec::with_capacity(inherited.len() + own.len());

    for registration in inherited.iter() {
        if namespace.contains_key(registration.operation()) {
            tracing::debug!(
                class = class_name,
                operation = registration.operation(),
                "user method overrides generated operation"
            );
            continue;
        }
        if effective
            .iter()
            .all(|r| r.operation() != registration.operation())
        {
            effective.push(registration.clone());
        }
    }

    for request in own {
        match effective
            .iter_mut()
            .find(|r| r.operation() == request.operation())
        {
            Some(slot) => *slot = request.clone(),
            None => effective.push(request.clone()),
        }
    }

    let unchanged = effective.len() == inherited.len()
        && effective
            .iter()
            .zip(inherited.iter())
            .all(|(a, b)| a.same_as(b));
    if unchanged {
        inherited.clone()
    } else {
        Arc::from(effective)
    }
}
