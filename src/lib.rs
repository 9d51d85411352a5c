//! bitext-align - Bilingual Alignment Scoring Engine
//!
//! Scores how well a candidate translation pair matches: a per-collection
//! translation cache in front of an LLM translator, a blended
//! lexical/semantic/length similarity score, and greedy sentence matching
//! inside a confirmed paragraph pair.

pub mod aligner;
pub mod cache;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod matcher;
pub mod scoring;
pub mod text;
pub mod translate;
pub mod workflow;
