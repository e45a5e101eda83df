//! Page content documents: one HTML file per page with a `<title>` and a
//! single `<img>`.

use std::cell::RefCell;
use std::path::Path;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::{TokenizerResult, local_name};

use crate::error::{Error, Result};
use crate::util::read_text_file;

/// What the classifier needs from a content document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Text of the first `<title>`, whitespace-trimmed. Empty if absent.
    pub title: String,
    /// `src` of the first `<img>`.
    pub image_src: String,
}

/// Read and parse a content document from disk.
pub fn read_page(path: &Path) -> Result<PageContent> {
    let html = read_text_file(path)?;
    parse_page(&html).ok_or_else(|| {
        Error::ManifestMalformed(format!("{} has no <img src>", path.display()))
    })
}

/// Parse a content document. `None` if it has no usable `<img src>`.
pub fn parse_page(html: &str) -> Option<PageContent> {
    let tokenizer = Tokenizer::new(PageSink::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from(html));
    match tokenizer.feed(&input) {
        TokenizerResult::Done => {}
        // PageSink never returns TokenSinkResult::Script, so there is no
        // script to run and nothing left to resume.
        TokenizerResult::Script(()) => {}
        // Likewise PageSink never returns TokenSinkResult::EncodingIndicator.
        TokenizerResult::EncodingIndicator(_) => {}
    }
    tokenizer.end();

    let state = tokenizer.sink.state.take();
    let image_src = state.image_src.filter(|src| !src.trim().is_empty())?;
    Some(PageContent {
        title: state.title.unwrap_or_default().trim().to_string(),
        image_src: image_src.trim().to_string(),
    })
}

#[derive(Default)]
struct SinkState {
    in_title: bool,
    title: Option<String>,
    title_done: bool,
    image_src: Option<String>,
}

/// Token sink that only records the first title and the first image.
///
/// Tokenizing is enough here; building a tree would be wasted work.
#[derive(Default)]
struct PageSink {
    state: RefCell<SinkState>,
}

impl TokenSink for PageSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let mut state = self.state.borrow_mut();
        match token {
            Token::TagToken(tag) if tag.name == local_name!("title") => match tag.kind {
                TagKind::StartTag if !state.title_done && !tag.self_closing => {
                    state.in_title = true;
                    state.title.get_or_insert_with(String::new);
                }
                TagKind::EndTag if state.in_title => {
                    state.in_title = false;
                    state.title_done = true;
                }
                _ => {}
            },
            Token::TagToken(tag)
                if tag.kind == TagKind::StartTag
                    && tag.name == local_name!("img")
                    && state.image_src.is_none() =>
            {
                state.image_src = tag
                    .attrs
                    .iter()
                    .find(|attr| attr.name.local == local_name!("src"))
                    .map(|attr| attr.value.to_string());
            }
            Token::CharacterTokens(text) if state.in_title => {
                if let Some(title) = state.title.as_mut() {
                    title.push_str(&text);
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}
