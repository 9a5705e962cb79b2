pub mod bridge;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod request;
pub mod response;
pub mod template;
pub mod transport;

pub use bridge::Bridge;
pub use descriptor::{QueryDescriptor, QueryDescriptorPatch, QueryType, VariableQueryDescriptor};
pub use error::{AppError, AppResult};
pub use frame::{Field, FieldType, Frame};
pub use request::{QueryRequest, RequestBuilder, TimeRange};
pub use response::{QueryResponse, QueryResult, VariableOption};
pub use template::{ScopedVars, TemplateEngine, VarInterpolator, VarValue};
pub use transport::{HttpTransport, QueryTransport};
