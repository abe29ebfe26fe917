//! The report document.

use maud::{html, Markup, PreEscaped, DOCTYPE};

/// Plain-text content of the five report sections. The template escapes it.
pub struct Sections {
    pub received: String,
    pub information: String,
    pub headers: String,
    pub body: String,
    pub parameters: String,
}

impl Sections {
    fn in_order(&self) -> [(&'static str, &str); 5] {
        [
            ("Request Received", self.received.as_str()),
            ("Request Information", self.information.as_str()),
            ("Request Headers", self.headers.as_str()),
            ("Request Body", self.body.as_str()),
            ("Request Parameters", self.parameters.as_str()),
        ]
    }
}

const STYLE: &str = "
        body {
            background-color: #004080;
            color: white;
            font-family: Arial, sans-serif;
            padding: 20px;
            margin: 0;
        }
        h2 {
            color: white;
            border-bottom: 1px solid #ccc;
            padding-bottom: 5px;
            margin-top: 20px;
        }
        pre {
            background-color: #002f5f;
            padding: 15px;
            border-radius: 5px;
            color: #f0f0f0;
            font-family: monospace;
            white-space: pre-wrap;
            word-wrap: break-word;
            overflow-x: auto;
        }
";

/// Assemble the full document.
pub fn document(sections: &Sections) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en-GB" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Webhook Request Received" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                @for (title, content) in sections.in_order() {
                    h2 { (title) }
                    pre { (content) }
                }
            }
        }
    }
}
