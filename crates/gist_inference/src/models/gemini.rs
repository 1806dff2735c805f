use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::{form_urlencoded, Url};

use gist_core::{Article, Category, ContentModel, DeepAnalysis, Error, Result, SpeechClip};

use crate::{pcm, Config};

const TTS_SAMPLE_RATE: u32 = 24_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// One story as the model is asked to emit it.
#[derive(Deserialize)]
struct RawStory {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    gist: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct GeminiModel {
    client: Client,
    api_key: String,
    config: Config,
}

impl GeminiModel {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone().unwrap_or_default(),
            config,
        })
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;
        Ok(response)
    }

    fn text_request(prompt: String) -> Vec<Content> {
        vec![Content {
            parts: vec![Part {
                text: Some(prompt),
                inline_data: None,
            }],
        }]
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[async_trait]
impl ContentModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn fetch_articles(&self, category: Category, location: &str) -> Result<Vec<Article>> {
        let dynamic_context = match category {
            Category::Bookmarks => {
                return Err(Error::Inference(
                    "bookmarks are served from the local store".to_string(),
                ))
            }
            Category::HomePolitics => format!(
                "Provide political news specifically relevant to {loc}. Focus on local \
                 governance, elections, and national policy within {loc}. Use reliable \
                 local news sources.",
                loc = location
            ),
            Category::InterPolitics => "Provide international political news, focusing on \
                 global relations, diplomacy between nations, and major world summits."
                .to_string(),
            other => format!("Provide news for the category: {}.", other),
        };

        let prompt = format!(
            "Act as a senior news editor. {} Provide the 6 most recent (last 24-48 hours) \
             and significant stories.\n\
             For each story, I need:\n\
             1. A compelling title.\n\
             2. A \"Gist\": A concise 2-3 sentence summary that captures the core facts. \
             CRITICAL: If the story involves key figures, experts, or stakeholders, \
             incorporate a direct or indirect quote into the gist to provide primary \
             perspective.\n\
             3. The primary news source name.\n\
             4. The ACTUAL CANONICAL URL of the news article. DO NOT use shortened links \
             or social media links. Ensure the URL is valid and links directly to the \
             news report.\n\n\
             Format the response exactly as a JSON array of objects with these keys: \
             title, gist, source, url. Do not include any markdown formatting blocks \
             like ```json. Just the raw array.",
            dynamic_context
        );

        let request = GenerateRequest {
            contents: Self::text_request(prompt),
            tools: Some(vec![Tool {
                google_search: serde_json::json!({}),
            }]),
            generation_config: None,
        };

        let response = self.generate(&self.config.news_model, &request).await?;
        let text = response_text(&response);
        let json = extract_json_array(&text).unwrap_or(text.as_str());

        let parsed: Vec<RawStory> = match serde_json::from_str(json) {
            Ok(parsed) => parsed,
            Err(err) => {
                // Models occasionally wrap or truncate the array; treat that
                // as an empty batch rather than a hard failure.
                warn!(error = %err, "failed to parse news JSON");
                return Ok(Vec::new());
            }
        };

        let minted = Utc::now().timestamp_millis();
        Ok(parsed
            .into_iter()
            .enumerate()
            .map(|(index, story)| {
                let title = story.title.unwrap_or_else(|| "Untitled".to_string());
                let url = story
                    .url
                    .filter(|u| Url::parse(u).is_ok())
                    .unwrap_or_else(|| "#".to_string());
                let seed: String = form_urlencoded::byte_serialize(title.as_bytes()).collect();
                Article {
                    id: format!("news-{}-{}", minted, index),
                    title,
                    gist: story
                        .gist
                        .unwrap_or_else(|| "No summary available.".to_string()),
                    source: story
                        .source
                        .unwrap_or_else(|| "Unknown Source".to_string()),
                    url,
                    published_at: Utc::now(),
                    category,
                    image_url: Some(format!("https://picsum.photos/seed/{}/800/450", seed)),
                }
            })
            .collect())
    }

    async fn synthesize(&self, title: &str, gist: &str) -> Result<Option<SpeechClip>> {
        let prompt = format!(
            "Read this news report. First, read the title: \"{}\". Then, pause for a \
             brief second, and read the summary: \"{}\"",
            title, gist
        );

        let request = GenerateRequest {
            contents: Self::text_request(prompt),
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.voice.clone(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        };

        let response = self.generate(&self.config.tts_model, &request).await?;
        let payload = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.iter().find_map(|p| p.inline_data.as_ref()));

        match payload {
            Some(inline) => {
                let bytes = BASE64
                    .decode(&inline.data)
                    .map_err(|e| Error::Synthesis(format!("bad audio payload: {}", e)))?;
                Ok(Some(pcm::decode_pcm16(&bytes, TTS_SAMPLE_RATE, 1)))
            }
            None => Ok(None),
        }
    }

    async fn analyze(&self, title: &str, gist: &str) -> Result<DeepAnalysis> {
        let prompt = format!(
            "Perform a deep analysis of this news story based on the title and summary \
             provided.\nTitle: {}\nSummary: {}\n\n\
             Provide:\n\
             1. Historical context or background explaining why this is happening.\n\
             2. Potential global or local implications of this specific news.\n\
             3. A thoughtful conclusion on where this leads next.\n\n\
             Format as JSON with keys: context, implications, conclusion.",
            title, gist
        );

        let request = GenerateRequest {
            contents: Self::text_request(prompt),
            tools: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..GenerationConfig::default()
            }),
        };

        let response = self.generate(&self.config.analysis_model, &request).await?;
        let text = response_text(&response);
        let json = extract_json_object(&text).unwrap_or(text.as_str());
        Ok(serde_json::from_str(json)?)
    }
}

fn response_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Slice out the outermost JSON array from model output that may be wrapped
/// in prose or code fences.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_array_from_fenced_output() {
        let text = "Here you go:\n```json\n[{\"title\": \"A\"}]\n```\nEnjoy!";
        assert_eq!(extract_json_array(text), Some("[{\"title\": \"A\"}]"));
    }

    #[test]
    fn extracts_nothing_without_an_array() {
        assert_eq!(extract_json_array("no json here"), None);
        assert_eq!(extract_json_array("] backwards ["), None);
    }

    #[test]
    fn extracts_object_for_analysis() {
        let text = "{\"context\": \"c\", \"implications\": \"i\", \"conclusion\": \"x\"}";
        let parsed: DeepAnalysis =
            serde_json::from_str(extract_json_object(text).unwrap()).unwrap();
        assert_eq!(parsed.context, "c");
        assert_eq!(parsed.conclusion, "x");
    }

    #[test]
    fn raw_stories_tolerate_missing_fields() {
        let json = r#"[{"title": "Only a title"}, {"gist": "just a gist", "url": "nonsense"}]"#;
        let parsed: Vec<RawStory> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title.as_deref(), Some("Only a title"));
        assert!(parsed[1].title.is_none());
    }

    #[test]
    fn tts_request_serializes_camel_case() {
        let request = GenerateRequest {
            contents: GeminiModel::text_request("hi".to_string()),
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Charon".to_string(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            json["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Charon"
        );
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn audio_response_payload_is_found() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"inlineData": {"mimeType": "audio/L16", "data": "AAA="}}]
                }
            }]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let inline = response.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .unwrap();
        assert_eq!(inline.data, "AAA=");
    }
}
