use kube::error::ErrorResponse;

const REASON_CONFLICT: &str = "Conflict";
const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

fn api_error(err: &anyhow::Error) -> Option<&ErrorResponse> {
    match err.downcast_ref::<kube::Error>() {
        Some(kube::Error::Api(resp)) => Some(resp),
        _ => None,
    }
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    api_error(err).is_some_and(|resp| resp.code == 404)
}

// The API server answers both an optimistic-concurrency failure and a create of an existing
// name with a 409; only the reason tells them apart.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    api_error(err).is_some_and(|resp| resp.code == 409 && resp.reason == REASON_CONFLICT)
}

pub fn is_already_exists(err: &anyhow::Error) -> bool {
    api_error(err).is_some_and(|resp| resp.code == 409 && resp.reason == REASON_ALREADY_EXISTS)
}

pub fn conflict_error(kind: &str, name: &str) -> anyhow::Error {
    status_error(409, REASON_CONFLICT, &format!("Operation cannot be fulfilled on {kind} \"{name}\": the object has been modified; please apply your changes to the latest version and try again"))
}

pub fn already_exists_error(kind: &str, name: &str) -> anyhow::Error {
    status_error(409, REASON_ALREADY_EXISTS, &format!("{kind} \"{name}\" already exists"))
}

pub fn not_found_error(kind: &str, name: &str) -> anyhow::Error {
    status_error(404, "NotFound", &format!("{kind} \"{name}\" not found"))
}

fn status_error(code: u16, reason: &str, message: &str) -> anyhow::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: message.into(),
        reason: reason.into(),
        code,
    })
    .into()
}
