use std::time::Duration;

use kube::core::admission::{
    AdmissionRequest,
    AdmissionResponse,
    AdmissionReview,
};
use mi_core::errors::*;
use mi_core::prelude::*;
use mi_injector::{
    Injector,
    RequestOptions,
};
use rocket::serde::json::Json;
use tracing::*;

err_impl! {WebhookError,
    #[error("pod mutation did not finish within {0} seconds")]
    MutationTimeout(u64),
}

pub struct MutationContext {
    injector: Injector,
    timeout: Duration,
    ignore_errors: bool,
}

impl MutationContext {
    pub fn new(injector: Injector, timeout: Duration, ignore_errors: bool) -> MutationContext {
        MutationContext { injector, timeout, ignore_errors }
    }
}

#[rocket::post("/mutate-v1-pod", data = "<body>")]
#[instrument(parent=None, skip_all)]
pub async fn handler(
    ctx: &rocket::State<MutationContext>,
    body: Json<AdmissionReview<corev1::Pod>>,
) -> Json<AdmissionReview<corev1::Pod>> {
    let req: AdmissionRequest<_> = match body.into_inner().try_into() {
        Ok(r) => r,
        Err(err) => {
            error!("could not parse request: {err:?}");
            let resp = AdmissionResponse::invalid(err);
            return Json(into_pod_review(resp));
        },
    };

    let mut resp = AdmissionResponse::from(&req);
    if let Some(pod) = &req.object {
        let opts = RequestOptions {
            namespace: req.namespace.clone().unwrap_or_default(),
            dry_run: req.dry_run,
        };
        resp = mutate_pod(ctx, resp, pod, &opts).await.unwrap_or_else(|err| {
            if ctx.ignore_errors {
                warn!("could not perform mutation, admitting pod unmodified: {err:?}");
                AdmissionResponse::from(&req)
            } else {
                error!("could not perform mutation, blocking pod object: {err:?}");
                AdmissionResponse::from(&req).deny(err)
            }
        });
    }

    Json(into_pod_review(resp))
}

// The final pod name usually isn't known yet at admission time, so only the namespace from the
// request is trustworthy here
#[instrument(skip_all, fields(namespace = %opts.namespace))]
pub async fn mutate_pod(
    ctx: &MutationContext,
    resp: AdmissionResponse,
    pod: &corev1::Pod,
    opts: &RequestOptions,
) -> anyhow::Result<AdmissionResponse> {
    let mut mutated = pod.clone();
    match tokio::time::timeout(ctx.timeout, ctx.injector.mutate(&mut mutated, opts)).await {
        Ok(res) => res?,
        Err(_) => bail!(WebhookError::mutation_timeout(&ctx.timeout.as_secs())),
    }

    if mutated == *pod {
        debug!("no mutation performed");
        return Ok(resp);
    }

    let patch = json_patch::diff(&serde_json::to_value(pod)?, &serde_json::to_value(&mutated)?);
    info!("injected monitoring sidecar ({} patch operations)", patch.0.len());
    Ok(resp.with_patch(patch)?)
}

// Have to duplicate this fn because AdmissionResponse::into_review uses the dynamic API
fn into_pod_review(resp: AdmissionResponse) -> AdmissionReview<corev1::Pod> {
    AdmissionReview {
        types: resp.types.clone(),
        // All that matters is that we keep the request UUID, which is in the TypeMeta
        request: None,
        response: Some(resp),
    }
}
