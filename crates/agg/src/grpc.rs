//! gRPC transport for the aggregation service.
//!
//! Every call opens its own channel, performs one unary exchange and drops
//! the channel. Calls block the current thread on a private single-threaded
//! runtime. From inside a multi-threaded tokio runtime the call moves off the
//! worker with `block_in_place`; a single-threaded runtime cannot block, so
//! calls from there fail with a configuration error (use `spawn_blocking`).

use std::future::Future;
use std::sync::Arc;

use primitives::{AggregateProof, ApplicationDescriptor, PendingTransaction, VerificationKey};
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tonic::codec::{BufferSettings, Codec, DecodeBuf, Decoder, ProstCodec};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Endpoint;
use tonic::{Code, Status};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AggError, Result};
use crate::transport::AggregatorTransport;
use crate::wire::{paths, proto};

pub struct GrpcTransport {
    config: ClientConfig,
    // Only taken in `drop`.
    runtime: Option<Runtime>,
}

impl GrpcTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AggError::Config(format!("cannot start runtime: {}", e)))?;
        Ok(Self { config, runtime: Some(runtime) })
    }

    pub fn from_env() -> Result<Self> { Self::new(ClientConfig::from_env()?) }

    pub fn config(&self) -> &ClientConfig { &self.config }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| AggError::Config("transport runtime already shut down".to_string()))?;
        match Handle::try_current() {
            Err(_) => Ok(runtime.block_on(future)),
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| runtime.block_on(future)))
            }
            Ok(_) => Err(AggError::Config(
                "blocking call from a single-threaded async runtime; use spawn_blocking".to_string(),
            )),
        }
    }

    fn call<Req, Resp>(&self, path: &'static str, request: Req, application: Option<&str>) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let endpoint = Endpoint::from_shared(self.config.uri())
            .map_err(|e| AggError::Config(format!("invalid endpoint: {}", e)))?
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.request_timeout());

        self.block_on(async move {
            let channel = endpoint.connect().await.map_err(|e| AggError::connect(e.to_string()))?;
            let mut grpc = tonic::client::Grpc::new(channel);
            grpc.ready().await.map_err(|e| AggError::connect(e.to_string()))?;
            debug!(path, "sending request");
            grpc.unary(tonic::Request::new(request), PathAndQuery::from_static(path), ReplyCodec::<Req, Resp>::default())
                .await
                .map(tonic::Response::into_inner)
                .map_err(|status| status_to_error(status, application))
        })?
    }
}

impl Drop for GrpcTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Dropping a runtime from async context panics.
            if Handle::try_current().is_ok() {
                runtime.shutdown_background();
            }
        }
    }
}

/// Marks a status raised while decoding the reply, as opposed to one sent by
/// the service.
#[derive(Debug, Error)]
#[error("undecodable reply: {0}")]
struct MalformedReply(String);

/// `ProstCodec` whose decode failures carry a `MalformedReply` source.
struct ReplyCodec<Req, Resp>(ProstCodec<Req, Resp>);

impl<Req, Resp> Default for ReplyCodec<Req, Resp> {
    fn default() -> Self { ReplyCodec(ProstCodec::default()) }
}

impl<Req, Resp> Codec for ReplyCodec<Req, Resp>
where
    Req: prost::Message + Send + 'static,
    Resp: prost::Message + Default + Send + 'static,
{
    type Encode = Req;
    type Decode = Resp;
    type Encoder = <ProstCodec<Req, Resp> as Codec>::Encoder;
    type Decoder = ReplyDecoder<<ProstCodec<Req, Resp> as Codec>::Decoder>;

    fn encoder(&mut self) -> Self::Encoder { self.0.encoder() }

    fn decoder(&mut self) -> Self::Decoder { ReplyDecoder(self.0.decoder()) }
}

struct ReplyDecoder<D>(D);

impl<D: Decoder<Error = Status>> Decoder for ReplyDecoder<D> {
    type Item = D::Item;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> std::result::Result<Option<Self::Item>, Status> {
        self.0.decode(src).map_err(|mut status| {
            let cause = MalformedReply(status.message().to_string());
            status.set_source(Arc::new(cause));
            status
        })
    }

    fn buffer_settings(&self) -> BufferSettings { self.0.buffer_settings() }
}

/// Map a gRPC status to the error taxonomy. Domain codes only make sense for
/// calls scoped to an application; elsewhere they are contract violations.
pub fn status_to_error(status: Status, application: Option<&str>) -> AggError {
    let message = status.message().to_string();
    let undecodable = std::error::Error::source(&status).is_some_and(|source| source.is::<MalformedReply>());
    if undecodable {
        return AggError::Protocol(format!("undecodable reply: {}", message));
    }
    match (status.code(), application) {
        (Code::AlreadyExists, Some(app)) => AggError::AlreadyRegistered(app.to_string()),
        (Code::NotFound, Some(app)) => AggError::UnknownApplication(app.to_string()),
        (Code::InvalidArgument, Some(_)) => AggError::InvalidProof(message),
        (Code::FailedPrecondition, Some(app)) => AggError::NoPendingTransactions(app.to_string()),
        (
            code @ (Code::Unavailable
            | Code::DeadlineExceeded
            | Code::Cancelled
            | Code::Unknown
            | Code::Internal
            | Code::Aborted
            | Code::ResourceExhausted),
            _,
        ) => AggError::exchange(format!("{:?}: {}", code, message)),
        (code, _) => AggError::Protocol(format!("unexpected status {:?}: {}", code, message)),
    }
}

impl AggregatorTransport for GrpcTransport {
    fn get_verification_key(&self) -> Result<VerificationKey> {
        let reply: proto::VerificationKey = self.call(paths::GET_VERIFICATION_KEY, (), None)?;
        VerificationKey::try_from(reply)
    }

    fn register_application(&self, application: &ApplicationDescriptor) -> Result<()> {
        let request = proto::ApplicationRegistration::from(application);
        self.call::<_, ()>(paths::REGISTER_APPLICATION, request, Some(&application.name))
    }

    fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()> {
        let request = proto::TransactionToAggregate::from(transaction);
        self.call::<_, ()>(paths::SUBMIT_TRANSACTION, request, Some(&transaction.application_name))
    }

    fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof> {
        let request = proto::ApplicationName { name: application_name.to_string() };
        let reply: proto::AggregateProof = self.call(paths::GENERATE_AGGREGATE_PROOF, request, Some(application_name))?;
        AggregateProof::try_from(reply)
    }
}
