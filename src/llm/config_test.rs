use super::*;
use crate::state::test_helpers::env_lock;

/// # Safety
/// Callers hold `env_lock()` so no other test touches the environment.
unsafe fn clear_llm_env() {
    unsafe {
        for key in [
            "LLM_PROVIDER",
            "LLM_MODEL",
            "LLM_API_KEY_ENV",
            "LLM_MAX_TOKENS",
            "LLM_OPENAI_MODE",
            "LLM_OPENAI_BASE_URL",
            "LLM_REQUEST_TIMEOUT_SECS",
            "LLM_CONNECT_TIMEOUT_SECS",
            "ANTHROPIC_API_KEY",
            "OPENAI_API_KEY",
            "ROUTER_TEST_KEY",
        ] {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn from_env_defaults_to_openai_chat_completions() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.max_tokens, DEFAULT_LLM_MAX_TOKENS);
    assert_eq!(cfg.openai_mode, OpenAiApiMode::ChatCompletions);
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_anthropic_uses_its_default_key_var() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "anthropic");
        std::env::set_var("ANTHROPIC_API_KEY", "ak-test");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.api_key, "ak-test");
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_parses_overrides() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "ROUTER_TEST_KEY");
        std::env::set_var("ROUTER_TEST_KEY", "secret");
        std::env::set_var("LLM_MODEL", "gpt-4.1-mini");
        std::env::set_var("LLM_MAX_TOKENS", "256");
        std::env::set_var("LLM_OPENAI_MODE", "responses");
        std::env::set_var("LLM_OPENAI_BASE_URL", "https://example.test/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "7");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "secret");
    assert_eq!(cfg.model, "gpt-4.1-mini");
    assert_eq!(cfg.max_tokens, 256);
    assert_eq!(cfg.openai_mode, OpenAiApiMode::Responses);
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_missing_key_names_the_variable() {
    let _guard = env_lock();
    unsafe { clear_llm_env() };

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "OPENAI_API_KEY"));
}

#[test]
fn from_env_unknown_provider_errors() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "bad");
    }

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_unknown_openai_mode_errors() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("LLM_OPENAI_MODE", "bad_mode");
    }

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unsupported openai_api mode"));

    unsafe { clear_llm_env() };
}
