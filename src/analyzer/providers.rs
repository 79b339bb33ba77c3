use serde::{Deserialize, Serialize};

use super::AnalyzerError;

#[derive(Debug, Clone)]
pub enum Provider {
    Gemini {
        api_key: String,
        model: String,
        base_url: String,
    },
    OpenRouter {
        api_key: String,
        model: String,
        base_url: String,
    },
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiAnswerPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiAnswerPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "gemini",
            Provider::OpenRouter { .. } => "openrouter",
        }
    }

    pub fn generate(
        &self,
        client: &reqwest::blocking::Client,
        prompt: &str,
    ) -> Result<String, AnalyzerError> {
        let request = match self {
            Provider::Gemini {
                api_key,
                model,
                base_url,
            } => {
                let url = format!(
                    "{}/v1beta/models/{model}:generateContent",
                    base_url.trim_end_matches('/')
                );
                client.post(url).query(&[("key", api_key)]).json(&GeminiRequest {
                    contents: [GeminiContent {
                        parts: [GeminiPart { text: prompt }],
                    }],
                })
            }
            Provider::OpenRouter {
                api_key,
                model,
                base_url,
            } => {
                let url = format!("{}/api/v1/chat/completions", base_url.trim_end_matches('/'));
                client.post(url).bearer_auth(api_key).json(&ChatRequest {
                    model,
                    messages: [ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                })
            }
        };

        let response = request
            .send()
            .map_err(|e| AnalyzerError::Unreachable(format!("{}: {e}", self.name())))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AnalyzerError::Unreachable(format!("{}: {e}", self.name())))?;

        let answer = match self {
            Provider::Gemini { .. } => parse_gemini(&body),
            Provider::OpenRouter { .. } => parse_openrouter(&body),
        };

        answer.map_err(|msg| {
            AnalyzerError::Rejected(format!("{} ({status}): {msg}", self.name()))
        })
    }
}

/// Concatenated text parts of the first candidate.
fn parse_gemini(body: &str) -> Result<String, String> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {e}"))?;

    if let Some(error) = response.error {
        return Err(error.message);
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    non_empty(text)
}

fn parse_openrouter(body: &str) -> Result<String, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed response: {e}"))?;

    if let Some(choices) = response.choices {
        let text = choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        return non_empty(text);
    }

    match response.error {
        Some(error) => Err(error.message),
        None => Err("response has neither choices nor error".to_string()),
    }
}

fn non_empty(text: String) -> Result<String, String> {
    if text.trim().is_empty() {
        Err("empty answer".to_string())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gemini() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"TITLE: A\n"},{"text":"SUMMARY: B"}]}}]}"#;
        assert_eq!(parse_gemini(body).unwrap(), "TITLE: A\nSUMMARY: B");
    }

    #[test]
    fn test_parse_gemini_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        assert_eq!(parse_gemini(body).unwrap_err(), "API key not valid");
        assert!(parse_gemini(r#"{"candidates":[]}"#).is_err());
        assert!(parse_gemini("<html>").is_err());
    }

    #[test]
    fn test_parse_openrouter() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"CATEGORY: Tech"}}]}"#;
        assert_eq!(parse_openrouter(body).unwrap(), "CATEGORY: Tech");
    }

    #[test]
    fn test_parse_openrouter_error() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        assert_eq!(parse_openrouter(body).unwrap_err(), "Rate limit exceeded");
        assert!(parse_openrouter(r#"{"choices":[{"message":{"content":""}}]}"#).is_err());
        assert!(parse_openrouter("{}").is_err());
    }

    #[test]
    fn test_request_shapes() {
        let gemini = serde_json::to_value(GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: "hi" }],
            }],
        })
        .unwrap();
        assert_eq!(gemini, serde_json::json!({"contents":[{"parts":[{"text":"hi"}]}]}));

        let chat = serde_json::to_value(ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
        })
        .unwrap();
        assert_eq!(
            chat,
            serde_json::json!({"model":"m","messages":[{"role":"user","content":"hi"}]})
        );
    }
}
