use botforge_core::definition::{AiConfig, NodeData};

/// AI takeover settings for a node: the enabled flag plus a value-copied
/// configuration.
///
/// The config is `Some` only when the author explicitly enabled takeover —
/// never an empty placeholder. A node that enabled takeover without its own
/// config gets a copy of the fixed default.
pub fn ai_takeover(data: &NodeData) -> (bool, Option<AiConfig>) {
    if !data.enable_ai_takeover {
        return (false, None);
    }
    let config = data.ai_config.clone().unwrap_or_default();
    (true, Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_takeover_yields_none() {
        let data = NodeData::default();
        let (enabled, config) = ai_takeover(&data);
        assert!(!enabled);
        assert!(config.is_none());
    }

    #[test]
    fn enabled_without_config_gets_the_default() {
        let data = NodeData {
            enable_ai_takeover: true,
            ..Default::default()
        };
        let (enabled, config) = ai_takeover(&data);
        assert!(enabled);
        assert_eq!(config, Some(AiConfig::default()));
    }

    #[test]
    fn supplied_config_is_value_copied() {
        let mut data = NodeData {
            enable_ai_takeover: true,
            ai_config: Some(AiConfig {
                model: "gpt-4".into(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let (_, config) = ai_takeover(&data);
        let config = config.unwrap();
        assert_eq!(config.model, "gpt-4");

        // Mutating the node afterwards must not affect the extracted copy
        data.ai_config.as_mut().unwrap().model = "mutated".into();
        assert_eq!(config.model, "gpt-4");
    }
}
