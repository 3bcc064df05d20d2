use serde::Serialize;

#[derive(Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RetryMatchResponse {
    pub matched: u32,
}

#[derive(Serialize)]
pub struct FeeTypeResponse {
    pub approved: bool,
}
