mod paragraph;
mod semantic;

pub use paragraph::ParagraphChunker;
pub use semantic::TextSplitterChunker;
