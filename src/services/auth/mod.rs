pub mod factory;
pub mod principal;
pub mod resolver;
pub mod token_codec;

pub use factory::build_token_codec;
pub use principal::{Authority, Principal};
pub use resolver::{PrincipalResolver, ResolveError};
pub use token_codec::{ClaimSet, TokenCodec, TokenError};
