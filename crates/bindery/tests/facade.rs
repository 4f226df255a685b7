use bindery::prelude::*;
use bindery::{
    BindError, CommentStyle, Document, NameStyle, Node, Serializer, SerializerRegistry, TypeInfo,
    TypeKey, Value,
};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, ConfigObject)]
struct Endpoint {
    host: String,
    port: u16,
    label: Option<String>,
    #[config(skip)]
    attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ConfigEnum)]
enum GameMode {
    Survival,
    #[config(rename = "creative")]
    Creative,
}

fn clamp_lives(lives: u8) -> u8 {
    lives.min(5)
}

fn local(port: u16) -> Endpoint {
    Endpoint { host: "localhost".into(), port, label: None, attempts: 0 }
}

#[interface(name = "server", comment = "Server settings")]
trait ServerConfig {
    #[config(default = 25565, comment = "Listen port")]
    fn port(&self) -> Result<u16>;
    fn set_port(&self, port: u16) -> Result<()>;

    #[config(default = "&aWelcome")]
    fn motd(&self) -> Result<String>;

    #[config(default = GameMode::Survival)]
    fn get_mode(&self) -> Result<GameMode>;
    fn set_mode(&self, mode: GameMode) -> Result<()>;

    #[config(default = vec![local(25566)], path = "network.endpoints")]
    fn endpoints(&self) -> Result<Vec<Endpoint>>;

    fn owner(&self) -> Result<Option<Uuid>>;
    fn set_owner(&self, owner: Option<Uuid>) -> Result<()>;

    #[config(default = 3, post = clamp_lives)]
    fn lives(&self) -> Result<u8>;
}

#[interface(name = "broken")]
trait BrokenConfig {
    fn name(&self) -> Result<String>;
    fn set_name(&self, name: u16) -> Result<()>;
}

#[interface(name = "chat")]
trait ChatConfig {
    #[config(default = "hello")]
    fn greeting_text(&self) -> Result<String>;
}

fn bindery(temp: &TempDir) -> Bindery {
    Bindery::builder()
        .directory(temp.path().join("config"))
        .translate_colors(true)
        .registry(SerializerRegistry::new())
        .build()
        .unwrap()
}

#[test]
fn test_init_writes_defaults_and_reads_them_back() {
    let temp = TempDir::new().unwrap();
    let bindery = bindery(&temp);
    let server = bindery.init::<BoundServerConfig>().unwrap();

    assert_eq!(server.port().unwrap(), 25565);
    assert_eq!(server.motd().unwrap(), "§aWelcome");
    assert_eq!(server.get_mode().unwrap(), GameMode::Survival);
    assert_eq!(server.endpoints().unwrap(), [local(25566)]);
    assert_eq!(server.owner().unwrap(), None);
    assert_eq!(server.lives().unwrap(), 3);

    let text = bindery.storage().read_to_string("server.yml").unwrap();
    assert!(text.starts_with("# Server settings\n\n# Listen port\nport: 25565\n"), "{text}");
    assert!(text.contains("motd: '&aWelcome'") || text.contains("motd: \"&aWelcome\""), "{text}");
    assert!(text.contains("network:\n  endpoints:\n"), "{text}");
}

#[test]
fn test_setters_persist_and_share_one_handle() {
    let temp = TempDir::new().unwrap();
    let bindery = bindery(&temp);
    let server = bindery.init::<BoundServerConfig>().unwrap();
    let owner = Uuid::new_v4();

    server.set_port(8080).unwrap();
    server.set_mode(GameMode::Creative).unwrap();
    server.set_owner(Some(owner)).unwrap();

    let again = bindery.configuration::<BoundServerConfig>().unwrap();
    assert_eq!(again.port().unwrap(), 8080);
    assert!(bindery.raw("server.yml").is_some());
    assert!(bindery.raw("missing").is_none());

    let reopened = self::bindery(&temp).init::<BoundServerConfig>().unwrap();
    assert_eq!(reopened.port().unwrap(), 8080);
    assert_eq!(reopened.get_mode().unwrap(), GameMode::Creative);
    assert_eq!(reopened.owner().unwrap(), Some(owner));

    let text = bindery.storage().read_to_string("server.yml").unwrap();
    assert!(text.contains("  value: creative\n  type: GameMode\n"), "{text}");

    reopened.set_owner(None).unwrap();
    assert_eq!(reopened.owner().unwrap(), None);
}

#[test]
fn test_post_process_applies_to_reloaded_values() {
    let temp = TempDir::new().unwrap();
    let bindery = bindery(&temp);
    let server = bindery.init::<BoundServerConfig>().unwrap();

    let text = bindery.storage().read_to_string("server.yml").unwrap().replace("lives: 3", "lives: 9");
    bindery.storage().write("server.yml", text.as_bytes()).unwrap();
    server.handle().reload().unwrap();

    assert_eq!(server.lives().unwrap(), 5);
}

#[test]
fn test_skipped_fields_are_rebuilt_from_default() {
    let temp = TempDir::new().unwrap();
    let bindery = bindery(&temp);
    let server = bindery.init::<BoundServerConfig>().unwrap();

    let mut endpoint = local(1);
    endpoint.attempts = 7;
    endpoint.label = Some("primary".into());
    server.handle().set("endpoints", vec![endpoint]).unwrap();

    server.handle().reload().unwrap();
    let endpoints = server.endpoints().unwrap();
    assert_eq!(endpoints[0].attempts, 0);
    assert_eq!(endpoints[0].label.as_deref(), Some("primary"));
}

#[test]
fn test_mismatched_setter_fails_init() {
    let temp = TempDir::new().unwrap();
    let result = bindery(&temp).init::<BoundBrokenConfig>();
    assert!(matches!(result, Err(BindError::InvalidSchema { .. })));
}

#[test]
fn test_builder_styles_reach_the_document() {
    let temp = TempDir::new().unwrap();
    let bindery = Bindery::builder()
        .directory(temp.path())
        .name_style(NameStyle::SnakeCase)
        .comment_style(CommentStyle::Inline)
        .registry(SerializerRegistry::new())
        .build()
        .unwrap();

    let chat = bindery.init::<BoundChatConfig>().unwrap();
    assert_eq!(chat.greeting_text().unwrap(), "hello");
    assert_eq!(bindery.storage().read_to_string("chat.yml").unwrap(), "greeting_text: hello\n");
}

#[test]
fn test_bundled_default_file_is_used() {
    let temp = TempDir::new().unwrap();
    let bindery = Bindery::builder()
        .directory(temp.path())
        .default_file("chat", "greetingText: howdy\n")
        .registry(SerializerRegistry::new())
        .build()
        .unwrap();

    let chat = bindery.init::<BoundChatConfig>().unwrap();
    assert_eq!(chat.greeting_text().unwrap(), "howdy");
}

/// Stores booleans as `enabled`/`disabled` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Toggle(bool);

impl Bindable for Toggle {
    fn type_info() -> TypeInfo {
        TypeInfo::Opaque { name: "Toggle" }
    }

    fn into_value(self) -> Value {
        Value::Opaque(bindery::OpaqueValue::new("Toggle", self))
    }

    fn from_value(value: Value) -> Result<Self> {
        let toggle = match &value {
            Value::Opaque(opaque) => opaque.downcast_ref::<Self>().copied(),
            _ => None,
        };
        toggle.ok_or_else(|| BindError::SchemaTypeMismatch {
            message: format!("expected Toggle, found {}", value.type_name()).into(),
            context: None,
        })
    }
}

#[derive(Debug)]
struct ToggleSerializer;

impl Serializer for ToggleSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::exact("Toggle")
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Toggle(on) = Toggle::from_value(value.clone())?;
        document.set(path, Value::Str(if on { "enabled" } else { "disabled" }.into()), registry)
    }

    fn deserialize(
        &self,
        path: &str,
        _declared: &TypeInfo,
        document: &Document,
        _registry: &SerializerRegistry,
    ) -> Result<Value> {
        match document.node(path).and_then(Node::as_scalar).map(ToString::to_string).as_deref() {
            Some("enabled") => Ok(Toggle(true).into_value()),
            Some("disabled") => Ok(Toggle(false).into_value()),
            _ => Err(BindError::InvalidData { message: format!("{path}: expected enabled or disabled").into(), context: None }),
        }
    }
}

#[interface(name = "features")]
trait FeatureConfig {
    #[config(default = Toggle(true))]
    fn chat(&self) -> Result<Toggle>;
}

#[test]
#[serial]
fn test_global_registry_feeds_new_instances() {
    let temp = TempDir::new().unwrap();
    bindery::register_serializer(TypeKey::exact("Toggle"), Arc::new(ToggleSerializer)).unwrap();
    assert!(bindery::registry().keys().any(|key| *key == TypeKey::exact("Toggle")));

    let bindery = Bindery::builder().directory(temp.path()).build().unwrap();
    let features = bindery.init::<BoundFeatureConfig>().unwrap();
    assert_eq!(features.chat().unwrap(), Toggle(true));
    assert_eq!(bindery.storage().read_to_string("features.yml").unwrap(), "chat: enabled\n");
}

#[test]
#[serial]
fn test_global_registration_checks_the_target() {
    let result = bindery::register_serializer(TypeKey::exact("Other"), Arc::new(ToggleSerializer));
    assert!(matches!(result, Err(BindError::InvalidRegistration { .. })));
}
