use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReflectError {
    #[error("no descriptor registered for reflect id {0}")]
    UnknownReflectId(crate::ReflectId),
}
