pub mod cosine;
pub mod openai;
