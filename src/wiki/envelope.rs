//! Decoding of `action=parse` response envelopes.
//!
//! ```json
//! {"parse": {"title": "Survivor 50", "pageid": 1, "wikitext": "..."}}
//! {"parse": {"title": "Survivor 50", "wikitext": {"*": "..."}}}
//! {"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}}
//! ```

use serde::Deserialize;

use super::FetchFailure;

#[derive(Debug, Deserialize)]
struct Envelope {
    parse: Option<ParsePayload>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct ParsePayload {
    wikitext: Option<Wikitext>,
}

/// `formatversion=2` returns a bare string, the legacy format nests it under `*`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Wikitext {
    Plain(String),
    Legacy {
        #[serde(rename = "*")]
        content: String,
    },
}

impl Wikitext {
    fn into_string(self) -> String {
        match self {
            Self::Plain(s) => s,
            Self::Legacy { content } => content,
        }
    }
}

/// Pull the page wikitext out of a response body.
///
/// An `error` object is [`FetchFailure::NotFound`]; anything else without
/// wikitext is [`FetchFailure::Malformed`].
pub fn read_wikitext(title: &str, body: &str) -> Result<String, FetchFailure> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    let envelope: Envelope =
        serde_path_to_error::deserialize(jd).map_err(|e| FetchFailure::Malformed {
            title: title.to_owned(),
            reason: match e.path().to_string().as_str() {
                "." | "" => e.inner().to_string(),
                path => format!("at path '{path}': {}", e.inner()),
            },
        })?;

    if let Some(error) = envelope.error {
        let reason = if error.info.is_empty() {
            error.code
        } else {
            format!("{}: {}", error.code, error.info)
        };
        return Err(FetchFailure::NotFound {
            title: title.to_owned(),
            reason,
        });
    }

    envelope
        .parse
        .and_then(|p| p.wikitext)
        .map(Wikitext::into_string)
        .ok_or_else(|| FetchFailure::Malformed {
            title: title.to_owned(),
            reason: "response has no wikitext field".to_owned(),
        })
}
