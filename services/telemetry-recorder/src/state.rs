use crate::recorder::Recorder;

#[derive(Clone)]
pub struct AppState {
    pub recorder: Recorder,
}

impl AppState {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}
