//! Pod spec extraction from controller resources.

use serde_json::Value;

use podgen_contracts::{
    controller::ControllerKind,
    error::{PodgenError, PodgenResult},
};

const POD_TEMPLATE_SPEC: &str = "/spec/template/spec";
const CRONJOB_POD_SPEC: &str = "/spec/jobTemplate/spec/template/spec";

/// The pod spec embedded in a controller resource.
///
/// Returns `Ok(None)` for kinds that are not pod controllers, and
/// `PodgenError::PodSpecNotFound` when a controller has no pod spec object at
/// the expected path.
pub fn extract_pod_spec(resource: &Value) -> PodgenResult<Option<Value>> {
    let Some(kind) = resource
        .get("kind")
        .and_then(Value::as_str)
        .and_then(|kind| kind.parse::<ControllerKind>().ok())
    else {
        return Ok(None);
    };

    let path = if kind.has_pod_template() {
        POD_TEMPLATE_SPEC
    } else {
        CRONJOB_POD_SPEC
    };
    match resource.pointer(path) {
        Some(spec @ Value::Object(_)) => Ok(Some(spec.clone())),
        _ => Err(PodgenError::PodSpecNotFound {
            kind: kind.to_string(),
        }),
    }
}
