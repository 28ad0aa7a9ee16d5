use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

use ecopyright_engine::clock::{Clock, ManualClock};
use ecopyright_engine::config::Config;
use ecopyright_engine::conversation::{assemble_prompt, ConversationMemory};
use ecopyright_engine::llm::MessageRole;
use ecopyright_engine::subscription::{InMemoryLedgerStore, RenewalPolicy, SubscriptionLedger};
use sdk::types::Turn;

fn memory_of(n: usize) -> ConversationMemory {
    let mut memory = ConversationMemory::new();
    for i in 0..n {
        if i % 2 == 0 {
            memory.record(Turn::user(format!("question {i}")));
        } else {
            memory.record(Turn::assistant(format!("answer {i}")));
        }
    }
    memory
}

// Window never exceeds k, and is the exact suffix of the transcript
proptest! {
    #[test]
    fn test_window_is_bounded_suffix(n in 0usize..40, k in 0usize..20) {
        let memory = memory_of(n);
        let window = memory.window(k);

        prop_assert_eq!(window.len(), n.min(k));
        prop_assert_eq!(window, &memory.turns()[n - window.len()..]);
        prop_assert_eq!(memory.len(), n);
    }
}

// Prompt is system + window + input, in that order
proptest! {
    #[test]
    fn test_prompt_shape(n in 0usize..30, k in 0usize..12, input in "[a-zA-Z ?]{1,50}") {
        let memory = memory_of(n);
        let prompt = assemble_prompt("Be truthful", memory.window(k), &input);

        prop_assert_eq!(prompt.len(), n.min(k) + 2);
        prop_assert_eq!(prompt[0].role, MessageRole::System);
        prop_assert_eq!(prompt.last().map(|m| m.role), Some(MessageRole::User));
        prop_assert_eq!(prompt.last().map(|m| m.content.as_str()), Some(input.as_str()));
    }
}

// Extensions on a fresh user sum exactly, under both policies, with the clock
// held still
proptest! {
    #[test]
    fn test_extensions_sum(days in prop::collection::vec(1i64..400, 1..12), accumulate in any::<bool>()) {
        let policy = if accumulate { RenewalPolicy::Accumulate } else { RenewalPolicy::Rebase };
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let ledger = SubscriptionLedger::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::clone(&clock) as Arc<dyn Clock>,
            policy,
        );

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let expiry = runtime.block_on(async {
            let mut last = None;
            for d in &days {
                last = Some(ledger.extend("u1", *d).await.unwrap());
            }
            last
        });

        let total: i64 = days.iter().sum();
        prop_assert_eq!(expiry, Some(now + Duration::days(total)));
    }
}

// Serialized configs parse back to the same values
proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        port in 1u16..,
        history_exchanges in 0usize..50,
        extension_days in 1i64..365,
        accumulate in any::<bool>(),
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level;
        config.server.port = port;
        config.conversation.history_exchanges = history_exchanges;
        config.subscription.extension_days = extension_days;
        config.subscription.renewal_policy = if accumulate {
            RenewalPolicy::Accumulate
        } else {
            RenewalPolicy::Rebase
        };

        let toml_string = toml::to_string(&config).expect("Failed to serialize Config to string");
        let parsed = Config::from_toml_str(&toml_string).expect("Failed to parse Config");

        prop_assert_eq!(config.core.log_level, parsed.core.log_level);
        prop_assert_eq!(config.server.port, parsed.server.port);
        prop_assert_eq!(config.conversation.history_exchanges, parsed.conversation.history_exchanges);
        prop_assert_eq!(config.subscription.extension_days, parsed.subscription.extension_days);
        prop_assert_eq!(config.subscription.renewal_policy, parsed.subscription.renewal_policy);
    }
}
