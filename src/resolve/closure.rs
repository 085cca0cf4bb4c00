//! Link closure: languages reaching the final link and the linker language.

use std::rc::Rc;

use serde::Serialize;

use crate::genex::{extend_unique, preferred_language};
use crate::graph::{Configuration, TargetId};

use super::cache::{HeadKey, Pending};
use super::walk::WalkResult;
use super::{Lookup, Resolver};

/// Languages of everything a target's link pulls in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkClosure {
    /// Language used to drive the link.
    pub linker_language: Option<String>,
    /// Implementation languages followed by those of every reached
    /// interface, in walk order.
    pub languages: Vec<String>,
}

impl Resolver<'_> {
    /// Link closure of `target` for `config` as seen from `head`.
    #[must_use]
    pub fn link_closure(
        &self,
        target: TargetId,
        config: &Configuration,
        head: Option<TargetId>,
    ) -> Rc<LinkClosure> {
        let key = HeadKey::new(target, config, head);
        self.cache
            .memoize(
                &self.cache.closures,
                &key,
                Pending::Closure(key.clone()),
                || Rc::new(self.compute_closure(&key)),
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                Rc::default()
            })
    }

    /// Walk over the interfaces of the link implementation.
    pub(crate) fn implementation_walk(
        &self,
        target: TargetId,
        config: &Configuration,
        head: TargetId,
    ) -> Rc<WalkResult> {
        let key = HeadKey::new(target, config, Some(head));
        self.cache
            .memoize(
                &self.cache.implementation_walks,
                &key,
                Pending::ImplementationWalk(key.clone()),
                || {
                    let implementation = self.link_implementation(target, config);
                    Rc::new(self.walk(target, &implementation.libraries, config, head))
                },
            )
            .unwrap_or_else(|pending| {
                self.report_loop(&pending);
                Rc::default()
            })
    }

    fn compute_closure(&self, key: &HeadKey) -> LinkClosure {
        let implementation = self.link_implementation(key.target, &key.config);
        let walk = self.implementation_walk(key.target, &key.config, key.head);
        let mut languages = implementation.languages.clone();
        extend_unique(&mut languages, &walk.languages);

        let linker_language = self
            .evaluate_property(key.target, "LINKER_LANGUAGE", &key.config, key.head, Lookup::Raw)
            .filter(|language| !language.is_empty())
            .or_else(|| preferred_language(self.graph, &languages));
        tracing::debug!(
            name = self.target_name(key.target),
            config = %key.config,
            linker = linker_language.as_deref().unwrap_or("<none>"),
            "computed link closure"
        );
        LinkClosure {
            linker_language,
            languages,
        }
    }
}
