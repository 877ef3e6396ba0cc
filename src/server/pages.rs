//! Static pages served by the relay: the editor shell, a second sample
//! page and the not-found page, all wrapped in the same layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::html::escape;
use crate::sanitize::sanitize_html;

pub const EDITOR_PLACEHOLDER: &str = "What's on your mind?";

/// Head metadata injected by the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub charset: String,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        Self {
            title: "Quillcast".to_string(),
            description: "Sample".to_string(),
            keywords: "sample, something".to_string(),
            charset: "utf-8".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Editor,
    SecondPage,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    pub path: &'static str,
    pub chunk: &'static str,
    pub kind: PageKind,
}

const ROUTES: &[PageRoute] = &[
    PageRoute {
        path: "/",
        chunk: "component---src-pages-index-js",
        kind: PageKind::Editor,
    },
    PageRoute {
        path: "/page-2",
        chunk: "component---src-pages-page-2-js",
        kind: PageKind::SecondPage,
    },
    PageRoute {
        path: "/404",
        chunk: "component---src-pages-404-js",
        kind: PageKind::NotFound,
    },
];

/// A rendered page and whether it is the not-found page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub html: String,
    pub found: bool,
}

pub struct PageRegistry {
    site: SiteMetadata,
}

impl PageRegistry {
    pub fn new(site: SiteMetadata) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &SiteMetadata {
        &self.site
    }

    pub fn routes(&self) -> &'static [PageRoute] {
        ROUTES
    }

    /// Route path to chunk name
    pub fn chunk_map(&self) -> BTreeMap<&'static str, &'static str> {
        ROUTES.iter().map(|r| (r.path, r.chunk)).collect()
    }

    pub fn lookup(&self, path: &str) -> Option<&'static PageRoute> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        ROUTES
            .iter()
            .find(|r| r.path == path && r.kind != PageKind::NotFound)
    }

    /// Render `path`. `preview` is the last HTML seen on the channel; it is
    /// sanitized before it is placed in the page.
    pub fn render(&self, path: &str, preview: Option<&str>) -> RenderedPage {
        match self.lookup(path).map(|r| r.kind) {
            Some(PageKind::Editor) => RenderedPage {
                html: self.layout("Home", &editor_body(preview)),
                found: true,
            },
            Some(PageKind::SecondPage) => RenderedPage {
                html: self.layout("Page two", SECOND_PAGE_BODY),
                found: true,
            },
            Some(PageKind::NotFound) | None => RenderedPage {
                html: self.layout("404: Not found", NOT_FOUND_BODY),
                found: false,
            },
        }
    }

    fn layout(&self, page_title: &str, body: &str) -> String {
        let site = &self.site;
        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html>\n",
                "<head>\n",
                "  <meta charset=\"{charset}\">\n",
                "  <title>{page} | {title}</title>\n",
                "  <meta name=\"description\" content=\"{description}\">\n",
                "  <meta name=\"keywords\" content=\"{keywords}\">\n",
                "</head>\n",
                "<body>\n",
                "  <header><h1><a href=\"/\">{title}</a></h1></header>\n",
                "  <div class=\"container-fluid\">\n",
                "{body}\n",
                "  </div>\n",
                "</body>\n",
                "</html>\n"
            ),
            charset = escape(&site.charset),
            page = escape(page_title),
            title = escape(&site.title),
            description = escape(&site.description),
            keywords = escape(&site.keywords),
            body = body,
        )
    }
}

/// Read-only view of the shared document; editing happens in the clients.
fn editor_body(preview: Option<&str>) -> String {
    let preview = preview.map(sanitize_html).unwrap_or_default();
    let content = if preview.trim().is_empty() {
        format!("<p class=\"placeholder\">{}</p>", escape(EDITOR_PLACEHOLDER))
    } else {
        preview
    };
    format!(
        concat!(
            "    <div class=\"preview\" data-placeholder=\"{placeholder}\">{content}</div>\n",
            "    <a href=\"/page-2\">Go to page 2</a>"
        ),
        placeholder = escape(EDITOR_PLACEHOLDER),
        content = content,
    )
}

const SECOND_PAGE_BODY: &str = concat!(
    "    <h2>Hi from the second page</h2>\n",
    "    <p>Welcome to page 2</p>\n",
    "    <a href=\"/\">Go back to the homepage</a>"
);

const NOT_FOUND_BODY: &str = concat!(
    "    <h2>NOT FOUND</h2>\n",
    "    <p>You just hit a route that doesn't exist... the sadness.</p>"
);
