pub mod interface;
pub mod huggingface_llm;

pub use interface::ResponseGenerator;
pub use huggingface_llm::HuggingFaceLLM;
