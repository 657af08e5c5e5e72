//! Program building, kernel creation and argument binding.

use crate::tests::{env, sim_registry};
use crate::{
    Buffer, Error, EventList, Kernel, MemFlags, Program, Status, Wrapper,
};

const SRC: &str = r#"
    __kernel void add(__global float* buffer, float addend) {
        buffer[get_global_id(0)] += addend;
    }

    __kernel void scale(__global float* buffer, float factor) {
        buffer[get_global_id(0)] *= factor;
    }
"#;

#[test]
fn build_and_launch() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let wait = EventList::new();

    let program = Program::with_source(&e.context, &[SRC]).unwrap();
    program.build(&[e.device.clone()], "").unwrap();

    let kernel = Kernel::new(&program, "add").unwrap();
    assert_eq!(kernel.function_name().unwrap(), "add");

    let buf = Buffer::<f32>::new(&e.context, MemFlags::READ_WRITE, 128).unwrap();
    kernel.set_arg_buffer(0, &buf).unwrap();
    kernel.set_arg_scalar(1, 10.0f32).unwrap();

    let event = kernel.enqueue(&e.queue, [128, 0, 0], &wait).unwrap();
    assert!(event.is_complete().unwrap());
}

#[test]
fn second_entry_point() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let program = Program::with_source(&e.context, &[SRC]).unwrap();
    program.build(&[], "").unwrap();
    let kernel = Kernel::new(&program, "scale").unwrap();
    assert_eq!(kernel.function_name().unwrap(), "scale");
}

#[test]
fn build_failure_carries_the_log() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let program =
        Program::with_source(&e.context, &["#error deliberate failure\n"]).unwrap();
    match program.build(&[], "") {
        Err(Error::ProgramBuild(log)) => assert!(log.contains("deliberate failure")),
        other => panic!("expected ProgramBuild, got {:?}", other),
    }
}

#[test]
fn kernel_from_unbuilt_program_fails() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let program = Program::with_source(&e.context, &[SRC]).unwrap();
    let err = Kernel::new(&program, "add").unwrap_err();
    assert_eq!(err.api_status(), Some(Status::CL_INVALID_PROGRAM_EXECUTABLE));
}

#[test]
fn unknown_kernel_name_fails() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let program = Program::with_source(&e.context, &[SRC]).unwrap();
    program.build(&[], "").unwrap();
    let err = Kernel::new(&program, "missing").unwrap_err();
    assert_eq!(err.api_status(), Some(Status::CL_INVALID_KERNEL_NAME));
}

#[test]
fn program_source_and_dependencies() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);

    let program = Program::with_source(&e.context, &[SRC]).unwrap();
    assert!(program.source().unwrap().contains("__kernel void add"));
    assert_eq!(program.context().unwrap().handle(), e.context.handle());

    program.build(&[], "").unwrap();
    let kernel = Kernel::new(&program, "add").unwrap();
    assert_eq!(kernel.program().unwrap().handle(), program.handle());

    // The kernel keeps the program alive through its dependency edge.
    let program_handle = program.handle();
    drop(program);
    assert!(reg.get(program_handle).is_some());
}

#[test]
fn empty_source_list_is_rejected() {
    let (reg, _driver) = sim_registry();
    let e = env(&reg);
    let err = Program::with_source(&e.context, &[]).unwrap_err();
    assert!(err.is_args());
}
