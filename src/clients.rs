//! HTTP clients for the external collaborators: candidate source, stance
//! classifier, text completion, and similarity index.

pub mod candidates;
pub mod completion;
pub mod similarity;
pub mod stance;

pub use candidates::CandidateSourceClient;
pub use completion::CompletionClient;
pub use similarity::SimilarityIndexClient;
pub use stance::StanceClassifierClient;
