use bson::spec::BinarySubtype;
use bson::{doc, Binary, Document};

use strata_types::Anchor;

use crate::error::CodecResult;
use crate::wire::encode;

/// Field of the durable-tier document that carries the encoded blob.
pub const DATA_FIELD: &str = "data";

/// Render an anchor as a document for the durable tier.
///
/// The primary key is the canonical string form of the identifier and
/// the blob rides in [`DATA_FIELD`], so repeated upserts of the same
/// anchor converge on one document.
pub fn document(anchor: &Anchor) -> CodecResult<Document> {
    let blob = encode(anchor)?;
    let mut doc = doc! { "_id": anchor.id.to_string() };
    doc.insert(
        DATA_FIELD,
        Binary {
            subtype: BinarySubtype::Generic,
            bytes: blob,
        },
    );
    Ok(doc)
}
