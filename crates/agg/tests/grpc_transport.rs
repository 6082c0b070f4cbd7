//! `GrpcTransport` against a scripted in-process gRPC server.

use std::convert::Infallible;

use agg::wire::{paths, proto};
use agg::{AggError, AggregatorClient, ClientConfig, Delivery, GrpcTransport, TransportStage};
use primitives::{ApplicationDescriptor, ExtendedProof, PendingTransaction, PublicInput, SubmissionId, VerificationKey};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, BoxFuture, Context, Poll, Service};
use tonic::server::{NamedService, UnaryService};
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tonic::Status;

/// Same tag as `VerificationKey.raw` but a varint instead of bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
struct MismatchedKey {
    #[prost(uint64, tag = "1")]
    raw: u64,
}

struct Handler<Req, Resp>(fn(Req) -> Result<Resp, Status>);

impl<Req, Resp> UnaryService<Req> for Handler<Req, Resp> {
    type Response = Resp;
    type Future = std::future::Ready<Result<tonic::Response<Resp>, Status>>;

    fn call(&mut self, request: tonic::Request<Req>) -> Self::Future {
        std::future::ready((self.0)(request.into_inner()).map(tonic::Response::new))
    }
}

fn serve<Req, Resp>(
    req: http::Request<BoxBody>,
    handler: fn(Req) -> Result<Resp, Status>,
) -> BoxFuture<http::Response<BoxBody>, Infallible>
where
    Req: prost::Message + Default + Send + 'static,
    Resp: prost::Message + Send + 'static,
{
    Box::pin(async move {
        let mut grpc = tonic::server::Grpc::new(ProstCodec::<Resp, Req>::default());
        Ok(grpc.unary(Handler(handler), req).await)
    })
}

fn mismatched_key(_: ()) -> Result<MismatchedKey, Status> { Ok(MismatchedKey { raw: 7 }) }

fn register(req: proto::ApplicationRegistration) -> Result<(), Status> {
    if req.name == "taken" {
        return Err(Status::already_exists("name in use"));
    }
    Ok(())
}

fn draining(_: proto::TransactionToAggregate) -> Result<(), Status> { Err(Status::unavailable("draining")) }

fn aggregate(req: proto::ApplicationName) -> Result<proto::AggregateProof, Status> {
    Ok(proto::AggregateProof { application_name: req.name, submission_ids: vec![vec![3; 32]], proof: vec![9; 64] })
}

fn unimplemented(_: ()) -> Result<(), Status> { Err(Status::unimplemented("no such method")) }

#[derive(Clone)]
struct ScriptedAggregator;

impl NamedService for ScriptedAggregator {
    const NAME: &'static str = "aggregator.Aggregator";
}

impl Service<http::Request<BoxBody>> for ScriptedAggregator {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> { Poll::Ready(Ok(())) }

    fn call(&mut self, req: http::Request<BoxBody>) -> Self::Future {
        match req.uri().path() {
            paths::GET_VERIFICATION_KEY => serve(req, mismatched_key),
            paths::REGISTER_APPLICATION => serve(req, register),
            paths::SUBMIT_TRANSACTION => serve(req, draining),
            paths::GENERATE_AGGREGATE_PROOF => serve(req, aggregate),
            _ => serve(req, unimplemented),
        }
    }
}

/// Start the server on an ephemeral port. Keep the runtime alive for the
/// duration of the test.
fn start_server() -> (Runtime, String) {
    let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_all().build().unwrap();
    let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();
    let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
    let _server = runtime.spawn(Server::builder().add_service(ScriptedAggregator).serve_with_incoming(incoming));
    (runtime, addr.to_string())
}

fn client(endpoint: String) -> AggregatorClient<GrpcTransport> {
    AggregatorClient::new(GrpcTransport::new(ClientConfig::new(endpoint)).unwrap())
}

#[test]
fn undecodable_reply_is_a_protocol_error() {
    let (_server, endpoint) = start_server();
    let client = client(endpoint);

    let err = client.get_verification_key().unwrap_err();
    assert!(matches!(err, AggError::Protocol(_)), "{err}");
    assert!(!err.is_transient());
    assert_eq!(client.cached_verification_key(), None);
}

#[test]
fn registration_and_aggregation_over_the_wire() {
    let (_server, endpoint) = start_server();
    let client = client(endpoint);

    client.register_application(&ApplicationDescriptor::new("app-A", VerificationKey(vec![1]))).unwrap();
    let err = client.register_application(&ApplicationDescriptor::new("taken", VerificationKey(vec![1]))).unwrap_err();
    assert_eq!(err, AggError::AlreadyRegistered("taken".into()));

    let proof = client.generate_aggregate_proof("app-A").unwrap();
    assert_eq!(proof.application_name, "app-A");
    assert_eq!(proof.submission_ids, vec![SubmissionId([3; 32])]);
    assert_eq!(proof.proof.len(), 64);
}

#[test]
fn unavailable_service_leaves_delivery_unknown() {
    let (_server, endpoint) = start_server();
    let client = client(endpoint);

    let tx = PendingTransaction::new(
        "app-A",
        ExtendedProof { proof: vec![1], public_inputs: vec![PublicInput::from_u64(1)] },
        0,
    );
    let err = client.submit_transaction(&tx).unwrap_err();
    assert!(matches!(err, AggError::Transport { stage: TransportStage::Exchange, .. }), "{err}");
    assert_eq!(err.delivery(), Delivery::Unknown);
}
