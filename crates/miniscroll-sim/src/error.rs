use miniscroll_api::ObjectHandle;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimError {
    #[error("No config section named '{0}'")]
    UnknownSection(String),
    #[error("{0} does not exist")]
    UnknownObject(ObjectHandle),
    #[error("{0} is already being deleted")]
    AlreadyDeleted(ObjectHandle),
    #[error("No live object created from '{0}'")]
    NoObjectFor(String),
}
