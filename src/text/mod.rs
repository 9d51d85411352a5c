// Text preparation shared by the scorer and the sentence matcher:
// - normalize: canonical form used only for embedding comparison
// - split: paragraph to ordered sentences

pub mod normalize;
pub mod split;

pub use normalize::{normalize, normalize_with, NormalizeOptions};
pub use split::split_sentences;
