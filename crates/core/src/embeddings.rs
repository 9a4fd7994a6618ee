use crate::error::EmbeddingError;

/// Fixed-length image descriptor produced by the vision provider.
///
/// There is no mutable access; the vector index takes it by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.is_empty() {
            return Err(EmbeddingError::MalformedResponse(
                "vector field is empty".to_string(),
            ));
        }

        if values.iter().any(|value| !value.is_finite()) {
            return Err(EmbeddingError::MalformedResponse(
                "vector contains non-finite values".to_string(),
            ));
        }

        Ok(Self { values })
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}
