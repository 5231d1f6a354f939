use propkit_common::ObjectId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    NodeNotFound(ObjectId),
    #[error("no node named `{0}`")]
    UnknownName(String),
    #[error("the root node cannot be removed")]
    RootRemoval,
}
