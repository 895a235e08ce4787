use std::{collections::HashSet, sync::Arc};

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    producer::handle::SharedProducer,
};

/// Follow `following_producer` links from `head`, returning every producer in order.
///
/// Fails if a producer appears twice, which would make a pipeline swap back into an exhausted
/// producer.
pub fn walk_chain(head: &SharedProducer) -> PlayoutResult<Vec<SharedProducer>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut cur = Some(Arc::clone(head));
    while let Some(producer) = cur {
        if !seen.insert(producer.id()) {
            return Err(PlayoutError::validation(format!(
                "producer chain starting at {} loops back to {} ({})",
                head.id(),
                producer.id(),
                producer.label()
            )));
        }
        cur = producer.following_producer();
        out.push(producer);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/producer/chain.rs"]
mod tests;
