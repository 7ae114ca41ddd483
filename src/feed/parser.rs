use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// The payload could not be read as an RSS 2.0 document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Not a valid RSS document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Not an RSS document: {0}")]
    NotRss(String),

    #[error("Not a valid RSS document: input ends before all elements are closed")]
    Truncated,
}

/// The `<channel>` of an RSS 2.0 document.
///
/// Channel metadata is informational; missing elements come back empty.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

/// One `<item>` exactly as it appeared in the document.
///
/// Nothing is trimmed or validated here; that is the normalizer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn in_channel(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            _ => None,
        }
    }

    fn in_item(name: &[u8]) -> Option<Self> {
        match name {
            b"pubDate" => Some(Self::PubDate),
            other => Self::in_channel(other),
        }
    }
}

/// Text being collected for one field, opened at `depth`.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Walks the element tree one event at a time.
///
/// Elements are matched on their full qualified name, so `<atom:link>` or
/// `<media:title>` never stand in for `<link>` or `<title>`. Markup nested
/// inside a field contributes its text only.
#[derive(Default)]
struct FeedBuilder {
    feed: ParsedFeed,
    depth: usize,
    saw_root: bool,
    saw_channel: bool,
    in_channel: bool,
    item: Option<RawItem>,
    capture: Option<Capture>,
}

impl FeedBuilder {
    fn open(&mut self, name: &[u8]) -> Result<(), ParseError> {
        self.depth += 1;
        if self.capture.is_some() {
            return Ok(());
        }

        match self.depth {
            1 if name == b"rss" => self.saw_root = true,
            1 => {
                return Err(ParseError::NotRss(format!(
                    "root element is <{}>",
                    String::from_utf8_lossy(name)
                )))
            }
            2 if name == b"channel" => {
                self.saw_channel = true;
                self.in_channel = true;
            }
            3 if self.in_channel && name == b"item" => self.item = Some(RawItem::default()),
            3 if self.in_channel => self.start(Field::in_channel(name)),
            4 if self.item.is_some() => self.start(Field::in_item(name)),
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, field: Option<Field>) {
        self.capture = field.map(|field| Capture {
            field,
            depth: self.depth,
            text: String::new(),
        });
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn close(&mut self) {
        if self.capture.as_ref().is_some_and(|c| c.depth == self.depth) {
            if let Some(capture) = self.capture.take() {
                self.store(capture);
            }
        } else if self.capture.is_none() {
            match self.depth {
                3 => {
                    if let Some(item) = self.item.take() {
                        self.feed.items.push(item);
                    }
                }
                2 => self.in_channel = false,
                _ => {}
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// A repeated element overwrites the earlier one.
    fn store(&mut self, capture: Capture) {
        let slot = match self.item.as_mut() {
            Some(item) => match capture.field {
                Field::Title => &mut item.title,
                Field::Link => &mut item.link,
                Field::Description => &mut item.description,
                Field::PubDate => &mut item.pub_date,
            },
            None => match capture.field {
                Field::Title => &mut self.feed.title,
                Field::Link => &mut self.feed.link,
                Field::Description => &mut self.feed.description,
                Field::PubDate => return,
            },
        };
        *slot = capture.text;
    }

    fn finish(self) -> Result<ParsedFeed, ParseError> {
        if self.depth > 0 {
            return Err(ParseError::Truncated);
        }
        if !self.saw_root {
            return Err(ParseError::NotRss("no root element".to_string()));
        }
        if !self.saw_channel {
            return Err(ParseError::NotRss("<rss> has no <channel>".to_string()));
        }
        Ok(self.feed)
    }
}

/// Decodes an RSS 2.0 body into its channel and items, in document order.
///
/// Extension elements (`atom:`, `media:`, `dc:` and the like) are ignored.
///
/// # Security
///
/// SEC-002: `quick-xml` (0.37) never expands `<!ENTITY>` declarations, so a
/// hostile feed cannot pull in external entities. Text is unescaped with the
/// predefined XML entities only; anything else is a parse error.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut builder = FeedBuilder::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => builder.open(e.name().as_ref())?,
            Event::Empty(e) => {
                builder.open(e.name().as_ref())?;
                builder.close();
            }
            Event::End(_) => builder.close(),
            Event::Text(e) => builder.text(&e.unescape()?),
            Event::CData(e) => builder.text(&e.decode().map_err(quick_xml::Error::from)?),
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
  <title>Boot.dev Blog</title>
  <link>https://blog.boot.dev/</link>
  <description>Recent content on Boot.dev Blog</description>
  <atom:link href="https://blog.boot.dev/index.xml" rel="self" type="application/rss+xml"/>
  <item>
    <title>First &amp; Foremost</title>
    <link>https://blog.boot.dev/first/</link>
    <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    <guid>https://blog.boot.dev/first/</guid>
    <description><![CDATA[<p>Hello</p>]]></description>
  </item>
  <item>
    <title>Second</title>
    <link>https://blog.boot.dev/second/</link>
  </item>
</channel>
</rss>"#;

    fn single_item(body: &str) -> RawItem {
        let doc = format!(
            r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"
  xmlns:media="http://search.yahoo.com/mrss/" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel><title>T</title><item>{body}</item></channel></rss>"#
        );
        let mut feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 1);
        feed.items.remove(0)
    }

    #[test]
    fn test_parses_channel_and_items_in_order() {
        let feed = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Boot.dev Blog");
        assert_eq!(feed.link, "https://blog.boot.dev/");
        assert_eq!(feed.description, "Recent content on Boot.dev Blog");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(
            feed.items[0],
            RawItem {
                title: "First & Foremost".to_string(),
                link: "https://blog.boot.dev/first/".to_string(),
                description: "<p>Hello</p>".to_string(),
                pub_date: "Mon, 02 Jan 2006 15:04:05 -0700".to_string(),
            }
        );
        assert_eq!(feed.items[1].title, "Second");
    }

    #[test]
    fn test_missing_item_elements_are_empty_strings() {
        let feed = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(feed.items[1].description, "");
        assert_eq!(feed.items[1].pub_date, "");
    }

    #[test]
    fn test_channel_without_items_or_metadata() {
        let feed = parse_feed(br#"<rss version="2.0"><channel></channel></rss>"#).unwrap();
        assert!(feed.title.is_empty());
        assert!(feed.link.is_empty());
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_prefixed_title_next_to_title() {
        let item = single_item(
            "<title>Real</title><media:title>Media</media:title><link>https://x.example/1</link>",
        );
        assert_eq!(item.title, "Real");
        assert_eq!(item.link, "https://x.example/1");
    }

    #[test]
    fn test_atom_link_inside_item() {
        let item = single_item(
            r#"<title>T</title><link>https://x.example/1</link><atom:link href="https://x.example/other" rel="self"/>"#,
        );
        assert_eq!(item.link, "https://x.example/1");
    }

    #[test]
    fn test_dc_description_next_to_description() {
        let item = single_item(
            "<link>https://x.example/1</link><description>D</description><dc:description>DC</dc:description>",
        );
        assert_eq!(item.description, "D");
    }

    #[test]
    fn test_prefixed_element_before_plain_one() {
        let item = single_item(
            "<media:title>Media</media:title><title>Real</title><dc:date>2024-01-01</dc:date>",
        );
        assert_eq!(item.title, "Real");
        assert_eq!(item.pub_date, "");
    }

    #[test]
    fn test_inline_markup_in_title_keeps_text() {
        let item = single_item("<title>A <b>bold</b> move</title><link>https://x.example/1</link>");
        assert_eq!(item.title, "A bold move");
        assert_eq!(item.link, "https://x.example/1");
    }

    #[test]
    fn test_nested_extension_elements_are_skipped() {
        let item = single_item(
            r#"<media:group><media:title>Nope</media:title><media:content url="https://x.example/v.mp4"/></media:group>
<title>Kept</title><link>https://x.example/1</link>"#,
        );
        assert_eq!(item.title, "Kept");
        assert_eq!(item.link, "https://x.example/1");
    }

    #[test]
    fn test_self_closing_elements() {
        let feed = parse_feed(
            br#"<rss version="2.0"><channel><link/><item><title/><link>https://x.example/1</link></item><item/></channel></rss>"#,
        )
        .unwrap();
        assert_eq!(feed.link, "");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "");
        assert_eq!(feed.items[1], RawItem::default());
    }

    #[test]
    fn test_item_title_does_not_leak_into_channel() {
        let feed = parse_feed(
            br#"<rss><channel><item><title>Item</title></item><title>Channel</title></channel></rss>"#,
        )
        .unwrap();
        assert_eq!(feed.title, "Channel");
        assert_eq!(feed.items[0].title, "Item");
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_feed(b"<rss><channel><item>").is_err());
        assert!(parse_feed(b"<not valid xml").is_err());
        assert!(parse_feed(b"<rss><channel></item></channel></rss>").is_err());
        assert!(parse_feed(b"").is_err());
    }

    #[test]
    fn test_document_without_channel_is_error() {
        let atom = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Atom</title></feed>"#;
        assert!(matches!(
            parse_feed(atom.as_bytes()),
            Err(ParseError::NotRss(_))
        ));
        assert!(matches!(
            parse_feed(b"<rss version=\"2.0\"></rss>"),
            Err(ParseError::NotRss(_))
        ));
    }

    #[test]
    fn test_undeclared_entity_is_error() {
        let xxe = r#"<?xml version="1.0"?>
<!DOCTYPE rss [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<rss version="2.0"><channel><item><title>&xxe;</title></item></channel></rss>"#;
        assert!(parse_feed(xxe.as_bytes()).is_err());
    }
}
