use protobuf_codegen::Codegen;

fn main() {
    Codegen::new()
        .pure()
        .cargo_out_dir("generated")
        .input("src/protos/ir.proto")
        .include("src/protos")
        .run_from_script();
}
