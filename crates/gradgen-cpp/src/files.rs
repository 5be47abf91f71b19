use gradgen::target::{FileHeader, FragmentCollections, OutputFile};

use crate::utils::{namespace_guards, push_block, push_line};

pub const FUNCTIONS_H: &str = "Functions.h";
pub const FUNCTIONS_CPP: &str = "Functions.cpp";
pub const PY_FUNCTIONS_H: &str = "python_functions.h";
pub const PY_FUNCTIONS_CPP: &str = "python_functions.cpp";

pub(crate) fn render_all(fragments: &FragmentCollections, header: &FileHeader) -> Vec<OutputFile> {
    vec![
        functions_h(fragments, header),
        functions_cpp(fragments, header),
        python_functions_h(header),
        python_functions_cpp(fragments, header),
    ]
}

fn push_fragments(out: &mut String, fragments: &[String]) {
    for fragment in fragments {
        out.push_str(fragment);
        out.push('\n');
    }
}

fn functions_h(fragments: &FragmentCollections, header: &FileHeader) -> OutputFile {
    let comment = &header.generated_comment;
    let (open, close) = namespace_guards(&header.namespace);
    let mut out = String::new();
    push_block(
        &mut out,
        0,
        &format!(
            r#"
                #pragma once

                // {comment}

                #include <ATen/ATen.h>
                #include <ATen/TensorGeometry.h>

                #include "torch/csrc/autograd/function.h"
                #include "torch/csrc/autograd/variable.h"
                #include "torch/csrc/autograd/saved_variable.h"

                {open}

                using at::Scalar;
                using at::Tensor;
                using at::IntList;
                using at::Type;
                using at::TensorGeometry;

                struct TypeAndSize {{
                  TypeAndSize() : type(nullptr) {{}}
                  /* implicit */
                  TypeAndSize(const Tensor & t)
                    : sizes(t.sizes())
                    , type(&t.type()) {{}}

                  Tensor zeros() {{ return type->zeros(sizes); }}

                private:
                  std::vector<int64_t> sizes;
                  Type* type;
                }};
            "#
        ),
    );
    out.push('\n');
    push_fragments(&mut out, &fragments.declarations);
    push_line(&mut out, 0, &close);
    OutputFile {
        name: FUNCTIONS_H.to_string(),
        contents: out,
    }
}

fn functions_cpp(fragments: &FragmentCollections, header: &FileHeader) -> OutputFile {
    let comment = &header.generated_comment;
    let (open, close) = namespace_guards(&header.namespace);
    let mut out = String::new();
    push_block(
        &mut out,
        0,
        &format!(
            r#"
                // {comment}

                #include "{FUNCTIONS_H}"

                #include <array>
                #include <tuple>

                using at::Tensor;
                using at::Scalar;
                using at::IntList;
                using at::TensorList;

                {open}
            "#
        ),
    );
    out.push('\n');
    push_fragments(&mut out, &fragments.definitions);
    push_line(&mut out, 0, &close);
    OutputFile {
        name: FUNCTIONS_CPP.to_string(),
        contents: out,
    }
}

fn python_functions_h(header: &FileHeader) -> OutputFile {
    let comment = &header.generated_comment;
    let (open, close) = namespace_guards(&header.namespace);
    let mut out = String::new();
    push_block(
        &mut out,
        0,
        &format!(
            r#"
                #pragma once

                // {comment}

                #include <Python.h>

                {open}

                void initialize_autogenerated_functions();

                {close}
            "#
        ),
    );
    OutputFile {
        name: PY_FUNCTIONS_H.to_string(),
        contents: out,
    }
}

fn python_functions_cpp(fragments: &FragmentCollections, header: &FileHeader) -> OutputFile {
    let comment = &header.generated_comment;
    let (open, close) = namespace_guards(&header.namespace);
    let mut out = String::new();
    push_block(
        &mut out,
        0,
        &format!(
            r#"
                // {comment}

                #include "{PY_FUNCTIONS_H}"

                #include <Python.h>
                #include "{FUNCTIONS_H}"
                #include "torch/csrc/autograd/python_cpp_function.h"

                {open}

                template<typename C>
                static void addClass(PyTypeObject& type, const char* name) {{
                  _initFunctionPyTypeObject(type, name, nullptr, nullptr);
                  Py_INCREF(&type);
                  registerCppFunction(typeid(C), &type);
                }}

                void initialize_autogenerated_functions() {{
            "#
        ),
    );
    for registration in &fragments.registrations {
        push_block(&mut out, 1, registration);
    }
    push_line(&mut out, 0, "}");
    out.push('\n');
    push_line(&mut out, 0, &close);
    OutputFile {
        name: PY_FUNCTIONS_CPP.to_string(),
        contents: out,
    }
}
