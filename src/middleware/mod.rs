/*
 * Responsibility
 * - public interface of the middleware layers
 * - auth gate, CORS, HTTP-level limits and tracing
 */
pub mod auth;
pub mod cors;
pub mod http;
