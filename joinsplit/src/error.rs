use crate::note::NoteCommitment;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(
        "conservation violated: inputs sum {inputs}, outputs sum {outputs}, \
         public value delta {public_value_delta}"
    )]
    ConservationViolation {
        inputs: u128,
        outputs: u128,
        public_value_delta: i128,
    },
    #[error("duplicate input note {0}")]
    DuplicateInput(NoteCommitment),
    #[error("note {0} appears as both input and output of the transition")]
    NoteReused(NoteCommitment),
    #[error("note asset does not match the transition asset")]
    AssetMismatch,
    #[error("transition has no inputs and no outputs")]
    EmptyTransition,
}
