/*!
A low-level crate for reading PDF files.

This crate turns the bytes of a PDF file into an object graph. It reads the
cross-reference data of a file (classic tables, cross-reference streams and
hybrid files), rebuilds it by scanning the whole file when it is broken,
authenticates against the standard security handler and decrypts strings and
streams, and decodes stream data.

The entry point is [`Document`]. Objects are loaded lazily as they are
resolved, and derived resources can be cached in the object store of the
document through [`Document::load_resource`].

```no_run
use quire_syntax::Document;

let data = std::fs::read("document.pdf").unwrap();
let doc = Document::open(data).unwrap();

for page in doc.pages() {
    let content = page.content_data(&doc);
    println!("{} bytes of content", content.len());
}
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bit;
pub mod crypto;
mod document;
pub mod error;
pub mod filter;
pub mod function;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod reader;
mod repair;
pub mod store;
pub mod trivia;
pub(crate) mod util;
pub mod write;
pub mod xref;

pub use document::{DateTime, LETTER, LoadSettings, Metadata, Page, text_string};
pub use document::Document;
pub use error::{DocError, ErrorKind, Result, ResultExt};
pub use object::{Dict, Name, ObjRef, Object, Stream, StreamData};
