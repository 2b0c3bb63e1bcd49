use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Serialize, Debug)]
pub struct ClearResponse {
    pub success: bool,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
