#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("link {index} references node {endpoint}, but only {nodes} nodes were supplied")]
    LinkEndpointOutOfRange {
        index: usize,
        endpoint: usize,
        nodes: usize,
    },
    #[error("group {index} references node {member}, but only {nodes} nodes were supplied")]
    GroupMemberOutOfRange {
        index: usize,
        member: usize,
        nodes: usize,
    },
    #[error("group {index} references child group {child}, but only {groups} groups were supplied")]
    GroupChildOutOfRange {
        index: usize,
        child: usize,
        groups: usize,
    },
    #[error("constraint references node {node}, but only {nodes} nodes were supplied")]
    ConstraintNodeOutOfRange { node: usize, nodes: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
