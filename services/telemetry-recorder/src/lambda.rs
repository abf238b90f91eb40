use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use crate::models::RecorderResponse;
use crate::recorder::Recorder;

pub async fn run(recorder: Recorder) -> Result<(), Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let recorder = recorder.clone();
        async move { function_handler(&recorder, event).await }
    }))
    .await
}

// Failures are reported in the response body, never as an invocation error.
pub async fn function_handler(
    recorder: &Recorder,
    event: LambdaEvent<Value>,
) -> Result<RecorderResponse, Error> {
    let (payload, context) = event.into_parts();
    tracing::info!(request_id = %context.request_id, "lambda invocation");
    Ok(recorder.handle(payload).await)
}
