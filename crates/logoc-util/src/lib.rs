// typed handles into append-only arenas (Vec<T>)
// usage: make_idx!(pub SymbolIdx, Symbol);
#[macro_export]
macro_rules! make_idx {
    ($vis:vis $idx_name:ident, $type_name:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $idx_name(u32);

        impl $idx_name {
            #[allow(dead_code)]
            $vis fn from_push(vec: &mut Vec<$type_name>, val: $type_name) -> $idx_name {
                let idx = $idx_name(vec.len() as u32);
                vec.push(val);
                idx
            }

            #[allow(dead_code)]
            $vis fn get_inner(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl std::ops::Index<$idx_name> for Vec<$type_name> {
            type Output = $type_name;

            fn index(&self, index: $idx_name) -> &Self::Output {
                &self.as_slice()[index.0 as usize]
            }
        }

        impl std::ops::IndexMut<$idx_name> for Vec<$type_name> {
            fn index_mut(&mut self, index: $idx_name) -> &mut Self::Output {
                &mut self.as_mut_slice()[index.0 as usize]
            }
        }
    };
}
