//! Property-based tests for configuration validation
//!
//! Uses proptest to verify the two validation rules hold across arbitrary
//! durable-type lists and proxy lists.

use duraheap::{
    register_entity_factory_proxy, ConfigMap, EntityFactoryProxy, HeapError, InputSession,
    SessionState, DEFAULT_INPUT_CONFIG_PREFIX,
};
use proptest::prelude::*;
use std::sync::Arc;

struct GenericEntityProxy;

impl EntityFactoryProxy for GenericEntityProxy {
    fn entity_kind(&self) -> &str {
        "generic"
    }
}

fn type_tag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "boolean", "byte", "short", "integer", "long", "float", "double", "string", "chunk",
        "durable",
    ])
}

fn session_for(types: &[&str], proxies: usize) -> InputSession {
    register_entity_factory_proxy(Arc::new(GenericEntityProxy));

    let mut entries = vec![(
        "duraheap.input.durable-types".to_string(),
        types.join(","),
    )];
    if proxies > 0 {
        entries.push((
            "duraheap.input.entity-factory-proxies".to_string(),
            vec!["generic"; proxies].join(","),
        ));
    }

    InputSession::from_config(ConfigMap::from_iter(entries))
}

proptest! {
    #[test]
    fn prop_empty_type_list_always_fails(proxies in 0usize..4) {
        let mut session = session_for(&[], proxies);
        let err = session.read_config(DEFAULT_INPUT_CONFIG_PREFIX).unwrap_err();
        prop_assert!(matches!(err, HeapError::MissingDurableType));
        prop_assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn prop_validation_gates_on_first_entry_only(
        types in prop::collection::vec(type_tag(), 1..8),
        proxies in 0usize..4
    ) {
        let refs: Vec<&str> = types.iter().copied().collect();
        let mut session = session_for(&refs, proxies);

        let outcome = session.read_config(DEFAULT_INPUT_CONFIG_PREFIX);
        let needs_proxy = types[0] == "durable" && proxies == 0;

        if needs_proxy {
            prop_assert!(matches!(
                outcome,
                Err(HeapError::MissingEntityFactoryProxy)
            ));
            prop_assert_eq!(session.state(), SessionState::Failed);
        } else {
            prop_assert!(outcome.is_ok());
            prop_assert_eq!(session.state(), SessionState::Configured);
            prop_assert_eq!(session.durable_types().len(), types.len());
            prop_assert_eq!(session.entity_factory_proxies().len(), proxies);
        }
    }

    #[test]
    fn prop_slot_key_id_roundtrips(key in 0u64..u64::MAX) {
        let conf = ConfigMap::from_iter([
            ("duraheap.input.durable-types".to_string(), "long".to_string()),
            ("duraheap.input.slot-key-id".to_string(), key.to_string()),
        ]);

        let mut session = InputSession::from_config(conf);
        session.read_config(DEFAULT_INPUT_CONFIG_PREFIX).unwrap();
        prop_assert_eq!(session.slot_key_id(), key);
    }
}
