fn main() {
    // LogService is generated from hand-written prost messages in src/grpc.rs,
    // so there is no .proto file to compile.
    let service = tonic_build::manual::Service::builder()
        .name("LogService")
        .package("courier.logs")
        .method(
            tonic_build::manual::Method::builder()
                .name("write_log")
                .route_name("WriteLog")
                .input_type("crate::grpc::LogRequest")
                .output_type("crate::grpc::LogResponse")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
