pub mod gemini;
pub mod pacing;

/// Something that turns a prompt into free-form text.
///
/// The credential is handed over on every call and never kept by the backend.
pub trait GenerationBackend {
    fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String>;
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for &B {
    fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        (**self).generate(api_key, prompt)
    }
}

impl<B: GenerationBackend + ?Sized> GenerationBackend for Box<B> {
    fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        (**self).generate(api_key, prompt)
    }
}
