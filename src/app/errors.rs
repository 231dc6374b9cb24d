use crate::{
    eid::Eid,
    embeddings::EmbeddingError,
    notes::{EmptyContent, NoteNotFound},
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("note {0} not found")]
    NotFound(Eid),

    #[error("note content is empty")]
    EmptyContent,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0:?}")]
    Other(anyhow::Error),
}

// Repository errors travel as anyhow; recover the ones callers branch on.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(NoteNotFound(id)) = err.downcast_ref::<NoteNotFound>() {
            return AppError::NotFound(id.clone());
        }
        if err.downcast_ref::<EmptyContent>().is_some() {
            return AppError::EmptyContent;
        }
        AppError::Other(err)
    }
}
