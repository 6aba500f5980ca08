#![cfg(target_os = "macos")]

use metal_compute::{
    Buffer, CommandBufferStatus, CommandQueue, CompileOptions, ComputeError, ComputeJob, Device,
    DispatchForm, FunctionType, GridSize, KernelSource, ObjectArena, PipelineState, Stage,
    StorageMode,
    MAX_BUFFER_BINDINGS, MAX_INLINE_BYTES,
};
use objc2::rc::autoreleasepool;

const ADD_CONSTANT: &str = include_str!("../../../demos/add-constant/kernels/add_constant.metal");

const ADD_42: &str = r#"
kernel void add_42(device int *data [[buffer(0)]],
                   uint tid [[thread_position_in_grid]]) {
    data[tid] += 42;
}
"#;

const VERTEX_ONLY: &str = r#"
#include <metal_stdlib>
using namespace metal;

vertex float4 v() { return float4(0); }
"#;

const ADD_CONSTANT_WGSL: &str =
    include_str!("../../../demos/add-constant/kernels/add_constant.wgsl");

/// How `run_add_constant` launches the kernel.
#[derive(Debug, Clone, Copy)]
enum Launch {
    Threadgroups,
    Grid,
    ExactThreads,
}

fn add_constant_pipeline<'a>(device: &Device<'a>) -> PipelineState<'a> {
    let library = device
        .new_library_with_source(ADD_CONSTANT, &CompileOptions::default())
        .unwrap();
    let function = library.new_function("add_constant").unwrap();
    device.new_compute_pipeline_state(&function).unwrap()
}

fn run_add_constant<'a>(
    device: &Device<'a>,
    queue: &CommandQueue<'a>,
    pipeline: &PipelineState<'a>,
    input: &[i32],
    constant: i32,
    threads: usize,
    launch: Launch,
) -> Vec<i32> {
    let buffer = device.new_buffer_with_data(input, StorageMode::Shared).unwrap();
    let groups = GridSize::covering(input.len(), threads).unwrap();

    let mut command_buffer = queue.command_buffer().unwrap();
    let mut encoder = command_buffer.compute_encoder().unwrap();
    encoder.set_compute_pipeline_state(pipeline).unwrap();
    encoder.set_buffer(&buffer, 0, 0).unwrap();
    encoder.set_value(&constant, 1).unwrap();
    match launch {
        Launch::Threadgroups => encoder.dispatch_threadgroups_1d(groups, threads).unwrap(),
        Launch::Grid => encoder
            .dispatch_threadgroups(GridSize::new(groups, 1, 1), GridSize::new(threads, 1, 1))
            .unwrap(),
        Launch::ExactThreads => encoder
            .dispatch_threads(GridSize::linear(input.len()), GridSize::linear(threads))
            .unwrap(),
    }
    encoder.end_encoding().unwrap();
    command_buffer.commit().unwrap().wait_until_completed().unwrap();

    buffer.read::<i32>().unwrap()
}

#[test]
fn device_reports_its_limits() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        assert!(!device.name().unwrap().is_empty());
        assert!(device.max_buffer_length().unwrap() > 0);
        assert_eq!(arena.len(), 1);
    });
}

#[test]
fn compile_lookup_and_pipeline_succeed() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let library = device
            .new_library_with_source(ADD_CONSTANT, &CompileOptions::default().with_fast_math(false))
            .unwrap();
        assert_eq!(library.function_names().unwrap(), vec!["add_constant".to_string()]);

        let function = library.new_function("add_constant").unwrap();
        assert_eq!(function.name().unwrap(), "add_constant");

        assert_eq!(function.function_type().unwrap(), Some(FunctionType::Kernel));

        let pipeline = device.new_compute_pipeline_state(&function).unwrap();
        let slots: Vec<usize> = pipeline.buffer_slots().iter().collect();
        assert_eq!(slots, vec![0, 1]);
        assert!(pipeline.max_total_threads_per_threadgroup().unwrap() >= 1);
        assert!(pipeline.thread_execution_width().unwrap() >= 1);
        assert_eq!(arena.len(), 4);
    });
}

#[test]
fn syntax_errors_return_a_diagnostic() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let err = device
            .new_library_with_source("kernel void broken( {", &CompileOptions::default())
            .unwrap_err();
        match err {
            ComputeError::Compile { diagnostic } => assert!(!diagnostic.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        // Nothing was adopted for the failed compile.
        assert_eq!(arena.len(), 1);
    });
}

#[test]
fn invalid_metallib_bytes_return_a_diagnostic() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        match device.new_library_with_data(b"this is not a metallib").unwrap_err() {
            ComputeError::Compile { diagnostic } => assert!(!diagnostic.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(arena.len(), 1);
    });
}

#[test]
fn vertex_functions_cannot_build_a_compute_pipeline() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let library = device
            .new_library_with_source(VERTEX_ONLY, &CompileOptions::default())
            .unwrap();
        let function = library.new_function("v").unwrap();
        assert_eq!(function.function_type().unwrap(), Some(FunctionType::Vertex));

        match device.new_compute_pipeline_state(&function).unwrap_err() {
            ComputeError::PipelineState { function, diagnostic } => {
                assert_eq!(function, "v");
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        // Device, library and function only.
        assert_eq!(arena.len(), 3);
    });
}

#[test]
fn missing_functions_list_the_available_ones() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let library = device
            .new_library_with_source(ADD_CONSTANT, &CompileOptions::default())
            .unwrap();
        match library.new_function("add_constnat").unwrap_err() {
            ComputeError::FunctionNotFound { name, available } => {
                assert_eq!(name, "add_constnat");
                assert_eq!(available, vec!["add_constant".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    });
}

#[test]
fn adding_a_constant_round_trips() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);

        for (length, threads) in [(1, 1), (64, 1), (128, 1), (256, 32), (1024, 64)] {
            let input: Vec<i32> = (0..length as i32).map(|i| i * 3 - 100).collect();
            let output =
                run_add_constant(&device, &queue, &pipeline, &input, 7, threads, Launch::Threadgroups);
            assert_eq!(output.len(), input.len());
            for (i, (before, after)) in input.iter().zip(&output).enumerate() {
                assert_eq!(*after, before + 7, "index {i} of {length}");
            }
        }
    });
}

#[test]
fn linear_and_grid_dispatch_agree() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);

        let input: Vec<i32> = (0..512).collect();
        let linear =
            run_add_constant(&device, &queue, &pipeline, &input, -11, 16, Launch::Threadgroups);
        let grid = run_add_constant(&device, &queue, &pipeline, &input, -11, 16, Launch::Grid);
        assert_eq!(linear, grid);
    });
}

#[test]
fn exact_thread_dispatch_matches_threadgroups() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);

        let input: Vec<i32> = (0..256).map(|i| i * 2).collect();
        let groups =
            run_add_constant(&device, &queue, &pipeline, &input, 9, 32, Launch::Threadgroups);
        let threads =
            run_add_constant(&device, &queue, &pipeline, &input, 9, 32, Launch::ExactThreads);
        assert_eq!(threads, groups);
        assert_eq!(threads[255], 510 + 9);
    });
}

#[test]
fn default_job_adds_42_to_128_zeros() {
    autoreleasepool(|_| {
        let job = ComputeJob::new(KernelSource::Msl(ADD_42.into()), "add_42", vec![0i32; 128]);
        let result = job.run().unwrap();

        assert_eq!(result.output, vec![42; 128]);
        assert!(!result.device_name.is_empty());
        let stages: Vec<Stage> = result.stages.iter().map(|report| report.stage).collect();
        assert_eq!(stages.first(), Some(&Stage::Configure));
        assert_eq!(stages.last(), Some(&Stage::ReadOutput));
        assert_eq!(stages.len(), 13);
    });
}

#[test]
fn wgsl_job_matches_the_msl_kernel() {
    autoreleasepool(|_| {
        let input: Vec<i32> = (0..64).collect();
        let expected: Vec<i32> = input.iter().map(|v| v + 5).collect();

        let wgsl = ComputeJob::new(
            KernelSource::Wgsl(ADD_CONSTANT_WGSL.into()),
            "add_constant",
            input.clone(),
        )
        .with_params(&5i32)
        .run()
        .unwrap();
        assert_eq!(wgsl.output, expected);

        let msl = ComputeJob::new(KernelSource::Msl(ADD_CONSTANT.into()), "add_constant", input)
            .with_params(&5i32)
            .with_dispatch(DispatchForm::Grid)
            .run()
            .unwrap();
        assert_eq!(msl.output, expected);
    });
}

#[test]
fn failing_stages_stop_the_job() {
    autoreleasepool(|_| {
        let bad_source = ComputeJob::new(
            KernelSource::Msl("kernel void broken( {".into()),
            "broken",
            vec![0i32; 4],
        );
        let err = bad_source.run().unwrap_err();
        assert_eq!(err.stage, Stage::CompileLibrary);
        assert!(matches!(err.source, ComputeError::Compile { .. }));

        let bad_name = ComputeJob::new(KernelSource::Msl(ADD_42.into()), "add_43", vec![0i32; 4]);
        let err = bad_name.run().unwrap_err();
        assert_eq!(err.stage, Stage::LookupFunction);

        let uneven = ComputeJob::new(KernelSource::Msl(ADD_42.into()), "add_42", vec![0i32; 10])
            .with_threads_per_threadgroup(4);
        let err = uneven.run().unwrap_err();
        assert_eq!(err.stage, Stage::Configure);

        let shared_slot = ComputeJob::new(
            KernelSource::Msl(ADD_CONSTANT.into()),
            "add_constant",
            vec![0i32; 4],
        )
        .with_params(&1i32)
        .with_slots(1, 1);
        let err = shared_slot.run().unwrap_err();
        assert_eq!(err.stage, Stage::Configure);
        assert!(matches!(err.source, ComputeError::BindingConflict { index: 1 }));
    });
}

#[test]
fn mapped_access_waits_for_the_command_buffer() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);
        let buffer = device.new_buffer_with_data(&[1i32; 32], StorageMode::Shared).unwrap();

        let mut command_buffer = queue.command_buffer().unwrap();
        let mut encoder = command_buffer.compute_encoder().unwrap();
        encoder.set_compute_pipeline_state(&pipeline).unwrap();
        encoder.set_buffer(&buffer, 0, 0).unwrap();
        encoder.set_value(&1i32, 1).unwrap();
        encoder.dispatch_threadgroups_1d(32, 1).unwrap();
        encoder.end_encoding().unwrap();
        assert!(!buffer.is_in_flight());

        let committed = command_buffer.commit().unwrap();
        assert_ne!(committed.status().unwrap(), CommandBufferStatus::NotEnqueued);
        assert!(buffer.is_in_flight());
        assert!(matches!(buffer.contents(), Err(ComputeError::BufferInFlight)));
        assert!(matches!(buffer.read::<i32>(), Err(ComputeError::BufferInFlight)));
        assert!(matches!(buffer.write(&[0i32]), Err(ComputeError::BufferInFlight)));
        assert!(matches!(buffer.clone().read::<i32>(), Err(ComputeError::BufferInFlight)));

        committed.wait_until_completed().unwrap();
        assert!(!buffer.is_in_flight());
        assert_eq!(buffer.read::<i32>().unwrap(), vec![2; 32]);
    });
}

#[test]
fn dropping_a_committed_buffer_waits_for_it() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);
        let buffer = device.new_buffer_with_data(&[0i32; 8], StorageMode::Shared).unwrap();

        let mut command_buffer = queue.command_buffer().unwrap();
        let mut encoder = command_buffer.compute_encoder().unwrap();
        encoder.set_compute_pipeline_state(&pipeline).unwrap();
        encoder.set_buffer(&buffer, 0, 0).unwrap();
        encoder.set_value(&3i32, 1).unwrap();
        encoder.dispatch_threadgroups_1d(8, 1).unwrap();
        // Dropped without end_encoding: ended on drop.
        drop(encoder);

        drop(command_buffer.commit().unwrap());
        assert_eq!(buffer.read::<i32>().unwrap(), vec![3; 8]);
    });
}

#[test]
fn dispatch_requires_a_pipeline_state() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();

        let mut command_buffer = queue.command_buffer().unwrap();
        let mut encoder = command_buffer.compute_encoder().unwrap();
        assert!(matches!(
            encoder.dispatch_threadgroups_1d(1, 1),
            Err(ComputeError::MissingPipelineState)
        ));
        encoder.end_encoding().unwrap();
    });
}

#[test]
fn every_kernel_buffer_must_be_bound() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);
        let buffer = device.new_buffer_with_data(&[0i32; 4], StorageMode::Shared).unwrap();

        let mut command_buffer = queue.command_buffer().unwrap();
        let mut encoder = command_buffer.compute_encoder().unwrap();
        encoder.set_compute_pipeline_state(&pipeline).unwrap();
        encoder.set_buffer(&buffer, 0, 0).unwrap();
        assert!(matches!(
            encoder.dispatch_threadgroups_1d(4, 1),
            Err(ComputeError::MissingBinding { index: 1 })
        ));
        assert!(matches!(
            encoder.dispatch_threads(GridSize::linear(4), GridSize::linear(1)),
            Err(ComputeError::MissingBinding { index: 1 })
        ));

        encoder.set_value(&2i32, 1).unwrap();
        encoder.dispatch_threadgroups_1d(4, 1).unwrap();
        encoder.end_encoding().unwrap();
        command_buffer.commit().unwrap().wait_until_completed().unwrap();
        assert_eq!(buffer.read::<i32>().unwrap(), vec![2; 4]);
    });
}

#[test]
fn encoder_rejects_invalid_arguments() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();
        let queue = device.new_command_queue().unwrap();
        let pipeline = add_constant_pipeline(&device);
        let buffer: Buffer<'_> = device.new_buffer(64, StorageMode::Shared).unwrap();

        let mut command_buffer = queue.command_buffer().unwrap();
        let mut encoder = command_buffer.compute_encoder().unwrap();

        assert!(matches!(
            encoder.set_buffer(&buffer, 0, MAX_BUFFER_BINDINGS),
            Err(ComputeError::InvalidBinding { index: 31, max: 31 })
        ));
        assert!(matches!(
            encoder.set_buffer(&buffer, 64, 0),
            Err(ComputeError::BufferRange { offset: 64, length: 64 })
        ));
        assert!(matches!(
            encoder.set_bytes(&[], 1),
            Err(ComputeError::InlineBytes { length: 0, .. })
        ));
        assert!(matches!(
            encoder.set_bytes(&vec![0u8; MAX_INLINE_BYTES + 1], 1),
            Err(ComputeError::InlineBytes { .. })
        ));
        encoder.set_buffer(&buffer, 60, 0).unwrap();

        encoder.set_compute_pipeline_state(&pipeline).unwrap();
        assert!(matches!(
            encoder.dispatch_threadgroups(GridSize::new(1, 0, 1), GridSize::linear(1)),
            Err(ComputeError::InvalidDispatch(_))
        ));
        let max = pipeline.max_total_threads_per_threadgroup().unwrap();
        assert!(matches!(
            encoder.dispatch_threadgroups(GridSize::linear(1), GridSize::linear(max + 1)),
            Err(ComputeError::InvalidDispatch(_))
        ));
        encoder.end_encoding().unwrap();
    });
}

#[test]
fn buffers_check_storage_and_layout() {
    autoreleasepool(|_| {
        let arena = ObjectArena::new();
        let device = Device::system_default(&arena).unwrap();

        assert!(matches!(
            device.new_buffer(0, StorageMode::Shared),
            Err(ComputeError::EmptyBuffer)
        ));
        assert!(matches!(
            device.new_buffer_with_data::<u32>(&[], StorageMode::Shared),
            Err(ComputeError::EmptyBuffer)
        ));

        let private = device.new_buffer(16, StorageMode::Private).unwrap();
        assert!(matches!(private.read::<u32>(), Err(ComputeError::StorageNotMapped)));
        assert!(matches!(private.contents(), Err(ComputeError::StorageNotMapped)));

        let shared = device.new_buffer_with_data(&[1u32, 2, 3], StorageMode::Shared).unwrap();
        assert_eq!(shared.length(), 12);
        assert_eq!(shared.read::<u32>().unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            shared.read::<u64>(),
            Err(ComputeError::ElementLayout { length: 12, element: 8 })
        ));
        assert!(matches!(
            shared.write(&[0u32; 4]),
            Err(ComputeError::BufferOverflow { size: 16, length: 12 })
        ));

        shared.write(&[9u32]).unwrap();
        assert_eq!(shared.read::<u32>().unwrap(), vec![9, 2, 3]);
    });
}
