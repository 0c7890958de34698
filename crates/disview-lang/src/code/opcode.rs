use std::fmt::{self, Display, Formatter};

macro_rules! define_opcodes {
    ($($variant:ident = $code:expr => $description:expr),* $(,)?) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        #[allow(non_camel_case_types)]
        pub enum Opcode {
            $($variant),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant),*];

            /// The numeric opcode shown next to the name when numeric opcodes are enabled.
            pub fn code(&self) -> u8 {
                match self {
                    $(Opcode::$variant => $code),*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Opcode::$variant => stringify!($variant)),*
                }
            }

            /// One-line summary of what the instruction does.
            pub fn description(&self) -> &'static str {
                match self {
                    $(Opcode::$variant => $description),*
                }
            }

            pub fn from_name(name: &str) -> Option<Opcode> {
                match name {
                    $(stringify!($variant) => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

define_opcodes! {
    POP_TOP = 1 => "Removes the top-of-stack item.",
    PUSH_NULL = 2 => "Pushes a NULL marker used by the calling convention.",
    END_FOR = 4 => "Removes the iterator and the last value when a loop ends.",
    BINARY_OP_ADD_FLOAT = 6 => "BINARY_OP specialised for adding two floats.",
    BINARY_OP_ADD_INT = 7 => "BINARY_OP specialised for adding two ints.",
    BINARY_OP_ADD_UNICODE = 8 => "BINARY_OP specialised for concatenating two strings.",
    NOP = 9 => "Does nothing.",
    BINARY_OP_MULTIPLY_FLOAT = 10 => "BINARY_OP specialised for multiplying two floats.",
    UNARY_NEGATIVE = 11 => "Replaces the top of stack with its negation.",
    UNARY_NOT = 12 => "Replaces the top of stack with its logical negation.",
    BINARY_OP_MULTIPLY_INT = 13 => "BINARY_OP specialised for multiplying two ints.",
    BINARY_OP_SUBTRACT_FLOAT = 14 => "BINARY_OP specialised for subtracting two floats.",
    BINARY_OP_SUBTRACT_INT = 16 => "BINARY_OP specialised for subtracting two ints.",
    BINARY_SUBSCR_LIST_INT = 18 => "BINARY_SUBSCR specialised for indexing a list with an int.",
    BINARY_SUBSCR = 25 => "Pops a container and a key and pushes container[key].",
    CALL_BUILTIN_FAST = 40 => "CALL specialised for builtin functions.",
    COMPARE_OP_FLOAT = 58 => "COMPARE_OP specialised for two floats.",
    COMPARE_OP_INT = 59 => "COMPARE_OP specialised for two ints.",
    STORE_SUBSCR = 60 => "Implements container[key] = value.",
    COMPARE_OP_STR = 62 => "COMPARE_OP specialised for two strings.",
    FOR_ITER_LIST = 63 => "FOR_ITER specialised for list iterators.",
    FOR_ITER_TUPLE = 64 => "FOR_ITER specialised for tuple iterators.",
    FOR_ITER_RANGE = 65 => "FOR_ITER specialised for range iterators.",
    GET_ITER = 68 => "Replaces the top of stack with iter(top of stack).",
    LOAD_BUILD_CLASS = 71 => "Pushes builtins.__build_class__ for a class statement.",
    LOAD_GLOBAL_BUILTIN = 74 => "LOAD_GLOBAL specialised for names found in builtins.",
    LOAD_GLOBAL_MODULE = 75 => "LOAD_GLOBAL specialised for names found in module globals.",
    RETURN_VALUE = 83 => "Returns the top of stack to the caller.",
    STORE_NAME = 90 => "Binds the top of stack to a name in the current namespace.",
    UNPACK_SEQUENCE = 92 => "Unpacks the top of stack into count individual values.",
    FOR_ITER = 93 => "Pushes the next item of the iterator, or jumps past the loop when it is exhausted.",
    STORE_ATTR = 95 => "Implements obj.name = value.",
    STORE_GLOBAL = 97 => "Binds the top of stack to a global name.",
    SWAP = 99 => "Swaps the top of stack with the i-th item.",
    LOAD_CONST = 100 => "Pushes a constant onto the stack.",
    LOAD_NAME = 101 => "Pushes the value bound to a name in the current namespace.",
    BUILD_TUPLE = 102 => "Builds a tuple from count stack items.",
    BUILD_LIST = 103 => "Builds a list from count stack items.",
    LOAD_ATTR = 106 => "Replaces the top of stack with getattr(top of stack, name).",
    COMPARE_OP = 107 => "Performs a comparison operation on the top two stack items.",
    JUMP_FORWARD = 110 => "Jumps forward by the given offset.",
    POP_JUMP_IF_FALSE = 114 => "Pops the top of stack and jumps if it is false.",
    POP_JUMP_IF_TRUE = 115 => "Pops the top of stack and jumps if it is true.",
    LOAD_GLOBAL = 116 => "Pushes the value of a global or builtin name.",
    COPY = 120 => "Pushes a copy of the i-th stack item.",
    RETURN_CONST = 121 => "Returns a constant to the caller.",
    BINARY_OP = 122 => "Applies a binary or in-place operator to the top two stack items.",
    LOAD_FAST = 124 => "Pushes a reference to a local variable.",
    STORE_FAST = 125 => "Stores the top of stack into a local variable.",
    MAKE_FUNCTION = 132 => "Builds a function object from the code object on the stack.",
    MAKE_CELL = 135 => "Creates a cell for a variable captured by a nested function.",
    LOAD_CLOSURE = 136 => "Pushes the cell of a captured variable.",
    LOAD_DEREF = 137 => "Pushes the value held in a cell.",
    STORE_DEREF = 138 => "Stores the top of stack into a cell.",
    JUMP_BACKWARD = 140 => "Jumps backward by the given offset.",
    COPY_FREE_VARS = 149 => "Copies free variables from the closure into the frame.",
    RESUME = 151 => "Marks the start of a code object; does nothing at run time.",
    CALL = 171 => "Calls a callable with argc positional arguments.",
    CALL_INTRINSIC_1 = 173 => "Calls an intrinsic function with one argument.",
}

impl Opcode {
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Opcode::JUMP_FORWARD
                | Opcode::JUMP_BACKWARD
                | Opcode::POP_JUMP_IF_FALSE
                | Opcode::POP_JUMP_IF_TRUE
                | Opcode::FOR_ITER
                | Opcode::FOR_ITER_LIST
                | Opcode::FOR_ITER_TUPLE
                | Opcode::FOR_ITER_RANGE
        )
    }

    pub fn has_arg(&self) -> bool {
        !matches!(
            self,
            Opcode::POP_TOP
                | Opcode::PUSH_NULL
                | Opcode::END_FOR
                | Opcode::NOP
                | Opcode::UNARY_NEGATIVE
                | Opcode::UNARY_NOT
                | Opcode::BINARY_SUBSCR
                | Opcode::BINARY_SUBSCR_LIST_INT
                | Opcode::STORE_SUBSCR
                | Opcode::GET_ITER
                | Opcode::LOAD_BUILD_CLASS
                | Opcode::RETURN_VALUE
        )
    }

    /// The generic instruction a specialised one stands in for.
    pub fn deoptimize(&self) -> Opcode {
        match self {
            Opcode::BINARY_OP_ADD_FLOAT
            | Opcode::BINARY_OP_ADD_INT
            | Opcode::BINARY_OP_ADD_UNICODE
            | Opcode::BINARY_OP_MULTIPLY_FLOAT
            | Opcode::BINARY_OP_MULTIPLY_INT
            | Opcode::BINARY_OP_SUBTRACT_FLOAT
            | Opcode::BINARY_OP_SUBTRACT_INT => Opcode::BINARY_OP,
            Opcode::BINARY_SUBSCR_LIST_INT => Opcode::BINARY_SUBSCR,
            Opcode::CALL_BUILTIN_FAST => Opcode::CALL,
            Opcode::COMPARE_OP_FLOAT | Opcode::COMPARE_OP_INT | Opcode::COMPARE_OP_STR => {
                Opcode::COMPARE_OP
            }
            Opcode::FOR_ITER_LIST | Opcode::FOR_ITER_TUPLE | Opcode::FOR_ITER_RANGE => {
                Opcode::FOR_ITER
            }
            Opcode::LOAD_GLOBAL_BUILTIN | Opcode::LOAD_GLOBAL_MODULE => Opcode::LOAD_GLOBAL,
            op => *op,
        }
    }

    pub fn is_specialized(&self) -> bool {
        self.deoptimize() != *self
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes = Opcode::ALL.iter().map(Opcode::code).collect::<FxHashSet<_>>();
        assert_eq!(codes.len(), Opcode::ALL.len());
    }

    #[rstest]
    #[case(Opcode::LOAD_CONST, "LOAD_CONST", 100)]
    #[case(Opcode::RESUME, "RESUME", 151)]
    #[case(Opcode::BINARY_OP_ADD_INT, "BINARY_OP_ADD_INT", 7)]
    fn test_name_and_code(#[case] op: Opcode, #[case] name: &str, #[case] code: u8) {
        assert_eq!(op.name(), name);
        assert_eq!(op.to_string(), name);
        assert_eq!(op.code(), code);
    }

    #[rstest]
    #[case("LOAD_CONST", Some(Opcode::LOAD_CONST))]
    #[case("FOR_ITER_LIST", Some(Opcode::FOR_ITER_LIST))]
    #[case("LOAD_CONSTANT", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<Opcode>) {
        assert_eq!(Opcode::from_name(name), expected);
    }

    #[test]
    fn test_every_opcode_is_described() {
        for op in Opcode::ALL {
            assert!(!op.description().is_empty(), "{}", op);
            assert_eq!(Opcode::from_name(op.name()), Some(*op));
        }
    }

    #[rstest]
    #[case(Opcode::BINARY_OP_ADD_INT, Opcode::BINARY_OP)]
    #[case(Opcode::FOR_ITER_RANGE, Opcode::FOR_ITER)]
    #[case(Opcode::LOAD_GLOBAL_BUILTIN, Opcode::LOAD_GLOBAL)]
    #[case(Opcode::STORE_NAME, Opcode::STORE_NAME)]
    fn test_deoptimize(#[case] op: Opcode, #[case] expected: Opcode) {
        assert_eq!(op.deoptimize(), expected);
        assert_eq!(op.is_specialized(), op != expected);
    }

    #[test]
    fn test_specialized_jumps_keep_jump_semantics() {
        for op in Opcode::ALL {
            assert_eq!(op.is_jump(), op.deoptimize().is_jump(), "{}", op);
        }
    }
}
