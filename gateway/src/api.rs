use serde::Serialize;

use relay_core::Payload;

pub const GENERATE_ROUTE: &str = "/api/generate";

// Query string on POST /api/generate
#[derive(Debug, Default)]
pub struct GenerateQuery {
    pub echo: Option<String>, // "1" returns the normalized payload instead of forwarding
}

impl GenerateQuery {
    // Lenient like URLSearchParams: first occurrence wins, nothing is rejected.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let echo = raw.and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "echo")
                .map(|(_, value)| value.into_owned())
        });
        Self { echo }
    }

    pub fn is_echo(&self) -> bool {
        self.echo.as_deref() == Some("1")
    }
}

// Echo mode output: what would have been sent downstream
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub ok: bool,
    pub payload: Payload,
}

// GET /api/generate
#[derive(Debug, Serialize)]
pub struct RouteHealth {
    pub ok: bool,
    pub route: &'static str,
}

// Body of every 500
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}
