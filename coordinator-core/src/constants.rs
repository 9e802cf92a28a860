//! Application constants
//!
//! Single source of truth for paths, reserved names and defaults.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/coordinator.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Default Gemini endpoint
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini API path (fallback when not specified in config)
pub const DEFAULT_GEMINI_API_PATH: &str = "v1beta/models";

/// Reserved function name used both for the confirmation request call and
/// for the decision reply.
pub const REQUEST_CONFIRMATION: &str = "request_confirmation";

/// Environment variable carrying the Gemini API credential.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable naming the directory generated images are written to.
pub const OUTPUT_PATH_ENV: &str = "OUTPUT_IMAGE_PATH";

pub const DEFAULT_APP_NAME: &str = "image_coordinator";
pub const DEFAULT_USER_ID: &str = "test_user";
pub const DEFAULT_AGENT_NAME: &str = "image_agent";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_BULK_THRESHOLD: u32 = 1;
pub const DEFAULT_MAX_LLM_CALLS: u32 = 20;

pub const DEFAULT_IMAGE_SERVER_NAME: &str = "image-generator";
pub const DEFAULT_IMAGE_SERVER_COMMAND: &str = "mcp-server-gemini-image-generator";
pub const DEFAULT_IMAGE_TOOL: &str = "generate_image_from_text";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_INSTRUCTION: &str = r#"You are a photograph coordinator assistant.

When users request to generate images:
 1. Use the create_image_order tool with the number of images requested and the image prompt.
 2. If the order status is 'pending', tell the user that approval is required and wait for an explicit decision.
 3. If the order status is 'approved', call the generate_image_from_text tool once for each approved image, using the given prompt.
 4. If the order status is 'rejected', do not generate any image.
 5. After the final result, give a short summary with the order status, the order ID (if any), the number of images and the image prompt.
 6. Keep responses concise but informative."#;

/// Sample query used when the CLI is started without one.
pub const SAMPLE_QUERY: &str = "Create 1 images of a photorealistic hand puppet with yarn for hair, 2 buttons for eyes, make it yellow and orange striped with a simple bedroom background blurred out";
